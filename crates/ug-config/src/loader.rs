//! Configuration loader with file and environment variable support

use crate::{AppConfig, ConfigError};
use std::env;
use std::path::PathBuf;
use tracing::info;

/// Standard config file search paths
const CONFIG_PATHS: &[&str] = &[
    "config.toml",
    "ug.toml",
    "./config/config.toml",
    "/etc/ug/config.toml",
];

/// Configuration loader
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Create a loader with a specific config file path
    pub fn with_path<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            config_path: Some(path.into()),
        }
    }

    /// Load configuration from file (if found) with environment variable overrides
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let mut config = AppConfig::default();

        if let Some(path) = self.find_config_file() {
            info!(?path, "Loading configuration from file");
            config = AppConfig::from_file(&path)?;
        }

        apply_env_overrides(&mut config, |key| env::var(key).ok());

        config.validate()?;
        Ok(config)
    }

    fn find_config_file(&self) -> Option<PathBuf> {
        if let Some(path) = &self.config_path {
            if path.exists() {
                return Some(path.clone());
            }
        }

        if let Ok(path) = env::var("UG_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        CONFIG_PATHS
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Apply `UG_*` overrides. `lookup` is injectable so tests do not touch the
/// process environment.
pub(crate) fn apply_env_overrides<F>(config: &mut AppConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    // HTTP
    if let Some(port) = lookup("UG_HTTP_PORT").and_then(|v| v.parse().ok()) {
        config.http.port = port;
    }
    if let Some(val) = lookup("UG_HTTP_HOST") {
        config.http.host = val;
    }
    if let Some(val) = lookup("UG_CORS_ORIGINS") {
        config.http.cors_origins = split_list(&val);
    }

    // Database
    if let Some(val) = lookup("UG_DATABASE_URL") {
        config.database.url = val;
    }
    if let Some(size) = lookup("UG_DATABASE_MAX_CONNECTIONS").and_then(|v| v.parse().ok()) {
        config.database.max_connections = size;
    }
    if let Some(val) = lookup("UG_DATABASE_INIT_SCHEMA") {
        config.database.init_schema = val.parse().unwrap_or(true);
    }

    // Loader
    if let Some(size) = lookup("UG_LOADER_MAX_BATCH_SIZE").and_then(|v| v.parse().ok()) {
        config.loader.max_batch_size = size;
    }
    if let Some(delay) = lookup("UG_LOADER_BATCH_DELAY_MS").and_then(|v| v.parse().ok()) {
        config.loader.batch_delay_ms = delay;
    }

    // Authorization
    if let Some(val) = lookup("UG_AUTHORIZATION_MODE") {
        config.authorization.mode = val;
    }
    if let Some(val) = lookup("UG_AUTHORIZATION_WRITER_ROLES") {
        config.authorization.writer_roles = split_list(&val);
    }
    if let Some(val) = lookup("UG_AUTHORIZATION_READER_ROLES") {
        config.authorization.reader_roles = split_list(&val);
    }

    // General
    if let Some(val) = lookup("UG_DEV_MODE") {
        config.dev_mode = val == "true" || val == "1";
    }
}
