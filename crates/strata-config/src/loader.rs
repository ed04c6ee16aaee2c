use crate::models::BuildConfig;
use crate::validation::validate_config;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use std::path::{Path, PathBuf};
use strata_core::StrataError;

/// Configuration resolver with defaults -> file -> env precedence.
pub struct ConfigResolver {
    file_path: Option<PathBuf>,
}

impl ConfigResolver {
    /// Resolver that only consults defaults and environment variables.
    pub fn env_only() -> Self {
        Self { file_path: None }
    }

    /// Resolver that also layers in the given TOML file, if it exists.
    pub fn with_file(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: Some(file_path.into()),
        }
    }

    /// Load configuration with precedence: env > file > defaults.
    pub fn load(&self) -> Result<BuildConfig, StrataError> {
        let mut figment = Figment::from(Serialized::defaults(BuildConfig::default()));

        if let Some(path) = &self.file_path {
            if path.exists() {
                figment = figment.merge(Toml::file(path));
            }
        }

        figment = figment.merge(Env::prefixed("STRATA_"));

        let config: BuildConfig = figment
            .extract()
            .map_err(|e| StrataError::config("<config>", e.to_string()))?;

        validate_config(&config)?;
        Ok(config)
    }
}

impl Default for ConfigResolver {
    fn default() -> Self {
        Self::env_only()
    }
}

/// Load configuration from defaults and environment only.
pub fn load_config() -> Result<BuildConfig, StrataError> {
    ConfigResolver::env_only().load()
}

/// Load configuration layering in a specific TOML file, with env overrides.
pub fn load_config_from_file(path: impl AsRef<Path>) -> Result<BuildConfig, StrataError> {
    ConfigResolver::with_file(path.as_ref().to_path_buf()).load()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn defaults_validate() {
        let config = BuildConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("strata.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "chunk_size = 256\nchunk_overlap = 32").unwrap();
        drop(file);

        let config = load_config_from_file(&path).unwrap();
        assert_eq!(config.chunk_size, 256);
        assert_eq!(config.chunk_overlap, 32);
        // Fields untouched by the file still fall back to the compiled-in default.
        assert_eq!(config.bm25_k1, BuildConfig::default().bm25_k1);
    }

    #[test]
    fn env_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("strata.toml");
        std::fs::write(&path, "chunk_size = 256\n").unwrap();

        std::env::set_var("STRATA_CHUNK_SIZE", "128");
        let config = load_config_from_file(&path).unwrap();
        std::env::remove_var("STRATA_CHUNK_SIZE");

        assert_eq!(config.chunk_size, 128);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = load_config_from_file("/nonexistent/strata.toml").unwrap();
        assert_eq!(config, BuildConfig::default());
    }

    #[test]
    fn invalid_override_is_rejected() {
        std::env::set_var("STRATA_BM25_B", "2.0");
        let result = load_config();
        std::env::remove_var("STRATA_BM25_B");
        assert!(result.is_err());
    }
}
