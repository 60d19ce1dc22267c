//! Configuration schema types
//!
//! This module defines the configuration structure for Ferry. Every tunable
//! named here maps one-to-one to a TOML key and a `FERRY_*` environment
//! override; defaults favor short timeouts appropriate to a
//! bounded-duration invocation.

use serde::{Deserialize, Serialize};

/// Runtime environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Development environment
    #[default]
    Development,
    /// Staging environment
    Staging,
    /// Production environment
    Production,
}

/// Main Ferry configuration
///
/// This is the root configuration structure that maps to the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FerryConfig {
    /// Application-level settings
    #[serde(default)]
    pub application: ApplicationConfig,

    /// Runtime environment (development, staging, production)
    #[serde(default)]
    pub environment: Environment,

    /// MongoDB source configuration
    pub source: SourceConfig,

    /// PostgreSQL target configuration
    pub target: TargetConfig,

    /// Batch/retry tunables
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl FerryConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid
    pub fn validate(&self) -> Result<(), String> {
        self.application.validate()?;
        self.source.validate()?;
        self.target.validate()?;
        self.pipeline.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Dry run mode (validate and report, don't write to PostgreSQL)
    #[serde(default)]
    pub dry_run: bool,
}

impl ApplicationConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }
        Ok(())
    }
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            dry_run: false,
        }
    }
}

/// MongoDB source configuration
///
/// Credentials are not stored here; `secret_name` names the secret the
/// credential store resolves at connect time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Name of the secret holding the connection URI
    pub secret_name: String,

    /// Database to read from
    pub database: String,

    /// Collection to read from
    pub collection: String,

    /// TCP connection establishment timeout
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Per-operation execution budget, distinct from connection timeouts
    #[serde(default = "default_socket_timeout_ms")]
    pub socket_timeout_ms: u64,

    /// Server selection timeout
    #[serde(default = "default_server_selection_timeout_ms")]
    pub server_selection_timeout_ms: u64,

    /// Maximum driver pool size
    #[serde(default = "default_max_pool_size")]
    pub max_pool_size: u32,
}

impl SourceConfig {
    fn validate(&self) -> Result<(), String> {
        if self.secret_name.is_empty() {
            return Err("source.secret_name cannot be empty".to_string());
        }
        if self.database.is_empty() {
            return Err("source.database cannot be empty".to_string());
        }
        if self.collection.is_empty() {
            return Err("source.collection cannot be empty".to_string());
        }
        if self.socket_timeout_ms == 0 {
            return Err("source.socket_timeout_ms must be positive".to_string());
        }
        if self.max_pool_size == 0 {
            return Err("source.max_pool_size must be positive".to_string());
        }
        Ok(())
    }
}

/// PostgreSQL target configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Name of the secret holding host/port/dbname/user/password fields
    pub secret_name: String,

    /// Maximum pool connections
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    /// Timeout for acquiring/establishing a pooled connection
    #[serde(default = "default_connect_timeout_seconds")]
    pub connect_timeout_seconds: u64,

    /// Per-statement execution budget
    #[serde(default = "default_statement_timeout_seconds")]
    pub statement_timeout_seconds: u64,
}

impl TargetConfig {
    fn validate(&self) -> Result<(), String> {
        if self.secret_name.is_empty() {
            return Err("target.secret_name cannot be empty".to_string());
        }
        if self.max_connections == 0 {
            return Err("target.max_connections must be positive".to_string());
        }
        if self.statement_timeout_seconds == 0 {
            return Err("target.statement_timeout_seconds must be positive".to_string());
        }
        Ok(())
    }
}

/// Batch sizing and retry policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Records per extract invocation
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Records per atomically-committed load sub-batch
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,

    /// Retries per sub-batch for transient write failures
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    /// Base delay for linear retry backoff (delay = base * attempt)
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
}

impl PipelineConfig {
    fn validate(&self) -> Result<(), String> {
        if self.batch_size == 0 {
            return Err("pipeline.batch_size must be positive".to_string());
        }
        if self.max_batch_size == 0 {
            return Err("pipeline.max_batch_size must be positive".to_string());
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            max_batch_size: default_max_batch_size(),
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Enable JSON file logging in addition to the console
    #[serde(default)]
    pub local_enabled: bool,

    /// Directory for rotated log files
    #[serde(default = "default_log_path")]
    pub local_path: String,

    /// Rotation policy: daily or hourly
    #[serde(default = "default_log_rotation")]
    pub local_rotation: String,
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_rotations = ["daily", "hourly"];
        if !valid_rotations.contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "Invalid logging.local_rotation '{}'. Must be one of: {}",
                self.local_rotation,
                valid_rotations.join(", ")
            ));
        }
        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: false,
            local_path: default_log_path(),
            local_rotation: default_log_rotation(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

// Short timeouts sized for a bounded-duration invocation
fn default_connect_timeout_ms() -> u64 {
    5_000
}

fn default_socket_timeout_ms() -> u64 {
    10_000
}

fn default_server_selection_timeout_ms() -> u64 {
    15_000
}

fn default_max_pool_size() -> u32 {
    10
}

fn default_max_connections() -> usize {
    10
}

fn default_connect_timeout_seconds() -> u64 {
    5
}

fn default_statement_timeout_seconds() -> u64 {
    30
}

fn default_batch_size() -> usize {
    1_000
}

fn default_max_batch_size() -> usize {
    100
}

fn default_max_retries() -> usize {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    500
}

fn default_log_path() -> String {
    "logs".to_string()
}

fn default_log_rotation() -> String {
    "daily".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_toml() -> &'static str {
        r#"
[source]
secret_name = "mongo"
database = "app"
collection = "users"

[target]
secret_name = "postgres"
"#
    }

    #[test]
    fn test_minimal_config_parses_with_defaults() {
        let config: FerryConfig = toml::from_str(minimal_toml()).unwrap();
        assert_eq!(config.application.log_level, "info");
        assert!(!config.application.dry_run);
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.source.connect_timeout_ms, 5_000);
        assert_eq!(config.source.socket_timeout_ms, 10_000);
        assert_eq!(config.source.server_selection_timeout_ms, 15_000);
        assert_eq!(config.source.max_pool_size, 10);
        assert_eq!(config.pipeline.batch_size, 1_000);
        assert_eq!(config.pipeline.max_batch_size, 100);
        assert_eq!(config.pipeline.max_retries, 3);
        assert_eq!(config.pipeline.retry_base_delay_ms, 500);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_log_level_rejected() {
        let mut config: FerryConfig = toml::from_str(minimal_toml()).unwrap();
        config.application.log_level = "verbose".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let mut config: FerryConfig = toml::from_str(minimal_toml()).unwrap();
        config.pipeline.batch_size = 0;
        let err = config.validate().unwrap_err();
        assert!(err.contains("batch_size"));
    }

    #[test]
    fn test_empty_collection_rejected() {
        let mut config: FerryConfig = toml::from_str(minimal_toml()).unwrap();
        config.source.collection = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_environment_parses_lowercase() {
        let toml_str = format!("environment = \"production\"\n{}", minimal_toml());
        let config: FerryConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(config.environment, Environment::Production);
    }

    #[test]
    fn test_invalid_rotation_rejected() {
        let mut config: FerryConfig = toml::from_str(minimal_toml()).unwrap();
        config.logging.local_rotation = "weekly".to_string();
        assert!(config.validate().is_err());
    }
}
