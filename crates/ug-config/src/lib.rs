//! UG Configuration System
//!
//! TOML-based configuration with environment variable overrides.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

mod loader;

pub use loader::ConfigLoader;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Root application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub database: DatabaseConfig,
    pub loader: LoaderConfig,
    pub authorization: AuthorizationConfig,

    /// Seed demo data on startup when the store is empty
    pub dev_mode: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            http: HttpConfig::default(),
            database: DatabaseConfig::default(),
            loader: LoaderConfig::default(),
            authorization: AuthorizationConfig::default(),
            dev_mode: false,
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub port: u16,
    pub host: String,
    pub cors_origins: Vec<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            host: "0.0.0.0".to_string(),
            cors_origins: vec!["*".to_string()],
        }
    }
}

/// Relational store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// sqlx connection URL, e.g. `sqlite://data/ug.db` or `sqlite::memory:`
    pub url: String,
    pub max_connections: u32,
    /// Create missing tables at startup
    pub init_schema: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://data/ug.db".to_string(),
            max_connections: 5,
            init_schema: true,
        }
    }
}

/// Request-scoped loader tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Keys per backend batch before the batch is sealed
    pub max_batch_size: usize,
    /// Extra wait before a batch is dispatched; 0 = one scheduler tick
    pub batch_delay_ms: u64,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            max_batch_size: 256,
            batch_delay_ms: 0,
        }
    }
}

/// Field-level authorization configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthorizationConfig {
    /// Policy: authenticated, role_based
    pub mode: String,
    /// Roles allowed to run mutations (role_based mode)
    pub writer_roles: Vec<String>,
    /// Roles allowed to read; empty means any authenticated caller
    pub reader_roles: Vec<String>,
}

impl Default for AuthorizationConfig {
    fn default() -> Self {
        Self {
            mode: "authenticated".to_string(),
            writer_roles: vec!["administrator".to_string()],
            reader_roles: Vec::new(),
        }
    }
}

const AUTHORIZATION_MODES: &[&str] = &["authenticated", "role_based"];

/// SQLite bound-variable limit; one batch binds one key per placeholder.
pub const MAX_BATCH_SIZE: usize = 32_766;

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration with environment variable override
    pub fn load() -> Result<Self, ConfigError> {
        ConfigLoader::new().load()
    }

    /// Reject settings the server cannot start with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.http.port == 0 {
            return Err(ConfigError::ValidationError("http.port must not be 0".into()));
        }
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::ValidationError("database.url is required".into()));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::ValidationError(
                "database.max_connections must be at least 1".into(),
            ));
        }
        if self.loader.max_batch_size == 0 {
            return Err(ConfigError::ValidationError(
                "loader.max_batch_size must be at least 1".into(),
            ));
        }
        if self.loader.max_batch_size > MAX_BATCH_SIZE {
            return Err(ConfigError::ValidationError(format!(
                "loader.max_batch_size must be at most {}, got {}",
                MAX_BATCH_SIZE, self.loader.max_batch_size
            )));
        }
        if !AUTHORIZATION_MODES.contains(&self.authorization.mode.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "authorization.mode must be one of {:?}, got '{}'",
                AUTHORIZATION_MODES, self.authorization.mode
            )));
        }
        Ok(())
    }

    /// Generate an example TOML configuration
    pub fn example_toml() -> String {
        r#"# UG Configuration
# Environment variables (UG_*) override these settings

dev_mode = false

[http]
port = 8000
host = "0.0.0.0"
cors_origins = ["*"]

[database]
url = "sqlite://data/ug.db"
max_connections = 5
init_schema = true

[loader]
max_batch_size = 256
batch_delay_ms = 0

[authorization]
mode = "authenticated"  # authenticated, role_based
writer_roles = ["administrator"]
reader_roles = []
"#
        .to_string()
    }
}
