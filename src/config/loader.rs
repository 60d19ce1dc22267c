//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::FerryConfig;
use crate::domain::errors::FerryError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into FerryConfig
/// 4. Applies environment variable overrides (FERRY_* prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns an error if:
/// - File cannot be read
/// - TOML parsing fails
/// - Environment variable substitution fails
/// - Configuration validation fails
///
/// # Examples
///
/// ```no_run
/// use ferry::config::load_config;
///
/// let config = load_config("ferry.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<FerryConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(FerryError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        FerryError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    let contents = substitute_env_vars(&contents)?;

    let mut config: FerryConfig = toml::from_str(&contents)
        .map_err(|e| FerryError::Configuration(format!("Failed to parse TOML: {}", e)))?;

    apply_env_overrides(&mut config);

    config.validate().map_err(|e| {
        FerryError::Configuration(format!("Configuration validation failed: {}", e))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// # Errors
///
/// Returns an error if a referenced environment variable is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").unwrap();
    let mut result = String::new();
    let mut missing_vars = Vec::new();

    // Process line by line to skip comments
    for line in input.lines() {
        let trimmed = line.trim_start();

        if trimmed.starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    let placeholder = format!("${{{}}}", var_name);
                    processed_line = processed_line.replace(&placeholder, &value);
                }
                Err(_) => {
                    if !missing_vars.contains(&var_name.to_string()) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        result.push_str(&processed_line);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(FerryError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

/// Applies environment variable overrides using FERRY_* prefix
///
/// Environment variables follow the pattern: FERRY_<SECTION>_<KEY>
/// For example: FERRY_SOURCE_COLLECTION, FERRY_PIPELINE_BATCH_SIZE
fn apply_env_overrides(config: &mut FerryConfig) {
    // Application overrides
    if let Ok(val) = std::env::var("FERRY_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }
    if let Ok(val) = std::env::var("FERRY_APPLICATION_DRY_RUN") {
        config.application.dry_run = val.parse().unwrap_or(false);
    }

    // Source overrides
    if let Ok(val) = std::env::var("FERRY_SOURCE_SECRET_NAME") {
        config.source.secret_name = val;
    }
    if let Ok(val) = std::env::var("FERRY_SOURCE_DATABASE") {
        config.source.database = val;
    }
    if let Ok(val) = std::env::var("FERRY_SOURCE_COLLECTION") {
        config.source.collection = val;
    }
    if let Ok(val) = std::env::var("FERRY_SOURCE_CONNECT_TIMEOUT_MS") {
        if let Ok(timeout) = val.parse() {
            config.source.connect_timeout_ms = timeout;
        }
    }
    if let Ok(val) = std::env::var("FERRY_SOURCE_SOCKET_TIMEOUT_MS") {
        if let Ok(timeout) = val.parse() {
            config.source.socket_timeout_ms = timeout;
        }
    }
    if let Ok(val) = std::env::var("FERRY_SOURCE_SERVER_SELECTION_TIMEOUT_MS") {
        if let Ok(timeout) = val.parse() {
            config.source.server_selection_timeout_ms = timeout;
        }
    }
    if let Ok(val) = std::env::var("FERRY_SOURCE_MAX_POOL_SIZE") {
        if let Ok(size) = val.parse() {
            config.source.max_pool_size = size;
        }
    }

    // Target overrides
    if let Ok(val) = std::env::var("FERRY_TARGET_SECRET_NAME") {
        config.target.secret_name = val;
    }
    if let Ok(val) = std::env::var("FERRY_TARGET_MAX_CONNECTIONS") {
        if let Ok(size) = val.parse() {
            config.target.max_connections = size;
        }
    }
    if let Ok(val) = std::env::var("FERRY_TARGET_CONNECT_TIMEOUT_SECONDS") {
        if let Ok(timeout) = val.parse() {
            config.target.connect_timeout_seconds = timeout;
        }
    }
    if let Ok(val) = std::env::var("FERRY_TARGET_STATEMENT_TIMEOUT_SECONDS") {
        if let Ok(timeout) = val.parse() {
            config.target.statement_timeout_seconds = timeout;
        }
    }

    // Pipeline overrides
    if let Ok(val) = std::env::var("FERRY_PIPELINE_BATCH_SIZE") {
        if let Ok(size) = val.parse() {
            config.pipeline.batch_size = size;
        }
    }
    if let Ok(val) = std::env::var("FERRY_PIPELINE_MAX_BATCH_SIZE") {
        if let Ok(size) = val.parse() {
            config.pipeline.max_batch_size = size;
        }
    }
    if let Ok(val) = std::env::var("FERRY_PIPELINE_MAX_RETRIES") {
        if let Ok(retries) = val.parse() {
            config.pipeline.max_retries = retries;
        }
    }
    if let Ok(val) = std::env::var("FERRY_PIPELINE_RETRY_BASE_DELAY_MS") {
        if let Ok(delay) = val.parse() {
            config.pipeline.retry_base_delay_ms = delay;
        }
    }

    // Logging overrides
    if let Ok(val) = std::env::var("FERRY_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = val.parse().unwrap_or(false);
    }
    if let Ok(val) = std::env::var("FERRY_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }
    if let Ok(val) = std::env::var("FERRY_LOGGING_LOCAL_ROTATION") {
        config.logging.local_rotation = val;
    }
}
