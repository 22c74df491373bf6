//! Configuration loader

use config::{Config, Environment, File};
use std::path::Path;

use super::types::AppConfig;
use crate::common::errors::{ClientError, Result};
use crate::common::types::MAX_BATCH_LEN;

/// Load configuration from file and environment variables
///
/// Priority (highest to lowest):
/// 1. Environment variables (prefixed with CLI_, nested keys split by `__`,
///    e.g. `CLI_CLIENT__SERVER_ADDRESS`)
/// 2. Configuration file (TOML format)
/// 3. Default values
pub fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    // Pick up a .env file if present
    dotenvy::dotenv().ok();

    let mut builder = Config::builder();

    if let Some(path) = config_path {
        if Path::new(path).exists() {
            builder = builder.add_source(File::with_name(path).required(false));
        }
    }

    builder = builder.add_source(
        Environment::with_prefix("CLI")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder
        .build()
        .map_err(|e| ClientError::Configuration(e.to_string()))?;

    let app_config: AppConfig = config
        .try_deserialize()
        .map_err(|e| ClientError::Configuration(e.to_string()))?;

    validate(&app_config)?;
    Ok(app_config)
}

/// Check the values the client cannot run without
pub fn validate(config: &AppConfig) -> Result<()> {
    let max = config.batch.max_amount;
    if max == 0 || max > MAX_BATCH_LEN {
        return Err(ClientError::Configuration(format!(
            "batch.max_amount must be between 1 and {}, got {}",
            MAX_BATCH_LEN, max
        )));
    }
    if config.client.server_address.trim().is_empty() {
        return Err(ClientError::Configuration(
            "client.server_address must not be empty".to_string(),
        ));
    }
    Ok(())
}
