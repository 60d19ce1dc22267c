//! Configuration management
//!
//! Configuration is loaded from a TOML file, with `${VAR}` environment
//! substitution and `FERRY_*` environment overrides applied before
//! validation.

pub mod loader;
pub mod schema;
pub mod secret;

pub use loader::load_config;
pub use schema::{
    ApplicationConfig, Environment, FerryConfig, LoggingConfig, PipelineConfig, SourceConfig,
    TargetConfig,
};
pub use secret::{secret_string, SecretString, SecretValue};
