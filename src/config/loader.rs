//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::{StoreBackend, StrataConfig};
use crate::config::secret_string;
use crate::domain::errors::StrataError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into StrataConfig
/// 4. Applies environment variable overrides (STRATA_* prefix)
/// 5. Validates the configuration
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
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
/// use strata::config::load_config;
///
/// let config = load_config("strata.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<StrataConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(StrataError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        StrataError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    // Perform environment variable substitution
    let contents = substitute_env_vars(&contents)?;

    // Parse TOML
    let mut config: StrataConfig = toml::from_str(&contents)
        .map_err(|e| StrataError::Configuration(format!("Failed to parse TOML: {}", e)))?;

    // Apply environment variable overrides
    apply_env_overrides(&mut config);

    // Validate configuration
    config.validate().map_err(|e| {
        StrataError::Configuration(format!("Configuration validation failed: {}", e))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are left untouched so a commented-out ${EXAMPLE} does
/// not fail the load.
///
/// # Errors
///
/// Returns an error if a referenced environment variable is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("valid placeholder regex");
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
        return Err(StrataError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

/// Applies environment variable overrides using the STRATA_* prefix
///
/// Environment variables follow the pattern: STRATA_<SECTION>_<KEY>
/// For example: STRATA_SOURCE_CONNECTION_STRING, STRATA_TRANSFORM_BATCH_SIZE
fn apply_env_overrides(config: &mut StrataConfig) {
    // Application overrides
    if let Ok(val) = std::env::var("STRATA_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }

    // Store backend override
    if let Ok(val) = std::env::var("STRATA_STORE_BACKEND") {
        match val.as_str() {
            "postgres" => config.store.backend = StoreBackend::Postgres,
            "memory" => config.store.backend = StoreBackend::Memory,
            _ => {}
        }
    }

    // Source database overrides
    if let Ok(val) = std::env::var("STRATA_SOURCE_CONNECTION_STRING") {
        config.source.connection_string = secret_string(val);
    }
    if let Ok(val) = std::env::var("STRATA_SOURCE_SCHEMA") {
        config.source.schema = val;
    }

    // Target database overrides
    if let Ok(val) = std::env::var("STRATA_TARGET_CONNECTION_STRING") {
        config.target.connection_string = secret_string(val);
    }
    if let Ok(val) = std::env::var("STRATA_TARGET_STAGING_SCHEMA") {
        config.target.staging_schema = val;
    }
    if let Ok(val) = std::env::var("STRATA_TARGET_DOMAIN_SCHEMA") {
        config.target.domain_schema = val;
    }

    // Sync overrides
    if let Ok(val) = std::env::var("STRATA_SYNC_CHUNK_SIZE") {
        if let Ok(size) = val.parse() {
            config.sync.chunk_size = size;
        }
    }

    // Transform overrides
    if let Ok(val) = std::env::var("STRATA_TRANSFORM_BATCH_SIZE") {
        if let Ok(size) = val.parse() {
            config.transform.batch_size = size;
        }
    }
    if let Ok(val) = std::env::var("STRATA_TRANSFORM_MAX_RECORDS") {
        if let Ok(cap) = val.parse() {
            config.transform.max_records = Some(cap);
        }
    }
    if let Ok(val) = std::env::var("STRATA_TRANSFORM_FETCH_ORDER") {
        config.transform.fetch_order = val;
    }

    // Blob overrides
    if let Ok(val) = std::env::var("STRATA_BLOB_ROOT") {
        config.blob.root = val.into();
    }

    // Logging overrides
    if let Ok(val) = std::env::var("STRATA_LOGGING_FILE_ENABLED") {
        config.logging.file_enabled = val.parse().unwrap_or(false);
    }
    if let Ok(val) = std::env::var("STRATA_LOGGING_FILE_DIRECTORY") {
        config.logging.file_directory = val;
    }
}
