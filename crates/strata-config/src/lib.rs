/// Configuration management for Strata's artifact builder.
///
/// This crate provides layered configuration:
/// - Compiled-in defaults
/// - Optional TOML file
/// - `STRATA_`-prefixed environment variables (highest precedence)
pub mod loader;
pub mod models;
pub mod validation;

pub use loader::{load_config, load_config_from_file, ConfigResolver};
pub use models::BuildConfig;
pub use validation::validate_config;
