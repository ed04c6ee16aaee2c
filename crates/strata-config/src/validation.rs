use crate::models::BuildConfig;
use strata_core::StrataError;

/// Trait for validating a configuration struct.
pub trait ConfigValidator<T> {
    fn validate(&self, config: &T) -> Result<(), StrataError>;
}

/// Validator enforcing the range and enum constraints on `BuildConfig`.
pub struct BuildConfigValidator;

impl ConfigValidator<BuildConfig> for BuildConfigValidator {
    fn validate(&self, config: &BuildConfig) -> Result<(), StrataError> {
        if config.chunk_size == 0 {
            return Err(StrataError::config(
                "chunk_size",
                "must be greater than 0",
            ));
        }

        if config.chunk_overlap >= config.chunk_size {
            return Err(StrataError::config(
                "chunk_overlap",
                format!(
                    "must be less than chunk_size ({} >= {})",
                    config.chunk_overlap, config.chunk_size
                ),
            ));
        }

        if config.bm25_k1 <= 0.0 {
            return Err(StrataError::config("bm25_k1", "must be greater than 0"));
        }

        if !(0.0..=1.0).contains(&config.bm25_b) {
            return Err(StrataError::config("bm25_b", "must be between 0 and 1"));
        }

        if config.compression != "zstd" {
            return Err(StrataError::config(
                "compression",
                format!("unsupported codec '{}', only zstd is supported", config.compression),
            ));
        }

        if !(1..=22).contains(&config.zstd_level) {
            return Err(StrataError::config(
                "zstd_level",
                "must be between 1 and 22",
            ));
        }

        if config.schema_version.is_empty() {
            return Err(StrataError::config("schema_version", "cannot be empty"));
        }

        if config.artifact_version.is_empty() {
            return Err(StrataError::config("artifact_version", "cannot be empty"));
        }

        Ok(())
    }
}

/// Validate a `BuildConfig` against the constraints used by the builder and index.
pub fn validate_config(config: &BuildConfig) -> Result<(), StrataError> {
    BuildConfigValidator.validate(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&BuildConfig::default()).is_ok());
    }

    #[test]
    fn zero_chunk_size_rejected() {
        let mut config = BuildConfig::default();
        config.chunk_size = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn overlap_must_be_smaller_than_chunk_size() {
        let mut config = BuildConfig::default();
        config.chunk_overlap = config.chunk_size;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("chunk_overlap"));
    }

    #[test]
    fn bm25_b_out_of_range_rejected() {
        let mut config = BuildConfig::default();
        config.bm25_b = 1.5;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn unsupported_compression_rejected() {
        let mut config = BuildConfig::default();
        config.compression = "lz4".to_string();
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("compression"));
    }

    #[test]
    fn zstd_level_out_of_range_rejected() {
        let mut config = BuildConfig::default();
        config.zstd_level = 23;
        assert!(validate_config(&config).is_err());
    }
}
