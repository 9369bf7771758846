//! Application configuration module
//!
//! Configuration is read from an optional TOML file (path in
//! `CHATSYNC_CONFIG`), then overridden by environment variables
//! (`DATABASE_URL`, `SERVER_PORT`, `JWT_SECRET`, `PAGE_SIZE`). Missing keys
//! take the defaults below.
//!
//! ```toml
//! server_port = 3000
//! database_url = "sqlite::memory:"
//! jwt_secret = "change-me"
//! page_size = 10
//!
//! [retry]
//! max_attempts = 3
//! base_delay_ms = 100
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable holding the config file path
pub const CONFIG_PATH_ENV: &str = "CHATSYNC_CONFIG";

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_JWT_SECRET: &str = "chatsync-dev-secret";
const DEFAULT_PAGE_SIZE: u32 = 10;
const DEFAULT_MAX_PAGE_SIZE: u32 = 50;
const DEFAULT_CONNECTION_BUFFER: usize = 64;

/// Backoff settings for transient persistence failures
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Total attempts including the first one
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 100,
            max_delay_ms: 2_000,
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server_port: u16,
    /// Sqlite url; the in-memory store is used when absent
    pub database_url: Option<String>,
    /// HS256 secret shared with the identity provider
    pub jwt_secret: String,
    /// Default page size for history fetches
    pub page_size: u32,
    /// Upper bound for a client-requested page size
    pub max_page_size: u32,
    /// Outbound event queue length per realtime connection
    pub connection_buffer: usize,
    pub retry: RetrySettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_port: DEFAULT_PORT,
            database_url: None,
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
            connection_buffer: DEFAULT_CONNECTION_BUFFER,
            retry: RetrySettings::default(),
        }
    }
}

impl AppConfig {
    /// Create a new AppConfigBuilder
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }

    /// Parse a TOML document; absent keys keep their defaults
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Load from `CHATSYNC_CONFIG` (if set) and the process environment
    pub fn load() -> Result<Self, ConfigError> {
        let config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::from_file(PathBuf::from(path))?,
            Err(_) => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())
    }

    /// Override fields from environment-style lookups
    pub fn apply_env<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("DATABASE_URL").filter(|v| !v.trim().is_empty()) {
            self.database_url = Some(url);
        }
        if let Some(port) = lookup("SERVER_PORT") {
            self.server_port = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue("SERVER_PORT", port))?;
        }
        if let Some(secret) = lookup("JWT_SECRET") {
            self.jwt_secret = secret;
        }
        if let Some(size) = lookup("PAGE_SIZE") {
            self.page_size = size
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue("PAGE_SIZE", size))?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.is_empty() {
            return Err(ConfigError::MissingValue("jwt_secret"));
        }
        if self.page_size == 0 {
            return Err(ConfigError::InvalidValue("page_size", self.page_size.to_string()));
        }
        if self.max_page_size < self.page_size {
            return Err(ConfigError::InvalidValue(
                "max_page_size",
                self.max_page_size.to_string(),
            ));
        }
        if self.connection_buffer == 0 {
            return Err(ConfigError::InvalidValue(
                "connection_buffer",
                self.connection_buffer.to_string(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::InvalidValue(
                "retry.max_attempts",
                self.retry.max_attempts.to_string(),
            ));
        }
        Ok(())
    }

    /// Page size actually used for a request
    pub fn clamp_page_size(&self, requested: Option<u32>) -> u32 {
        requested
            .filter(|limit| *limit > 0)
            .unwrap_or(self.page_size)
            .min(self.max_page_size)
    }
}

/// Builder for AppConfig
#[derive(Debug, Default)]
pub struct AppConfigBuilder {
    config: AppConfig,
}

impl AppConfigBuilder {
    pub fn server_port(mut self, port: u16) -> Self {
        self.config.server_port = port;
        self
    }

    pub fn database_url(mut self, url: impl Into<String>) -> Self {
        self.config.database_url = Some(url.into());
        self
    }

    pub fn jwt_secret(mut self, secret: impl Into<String>) -> Self {
        self.config.jwt_secret = secret.into();
        self
    }

    pub fn page_size(mut self, size: u32) -> Self {
        self.config.page_size = size;
        self
    }

    pub fn max_page_size(mut self, size: u32) -> Self {
        self.config.max_page_size = size;
        self
    }

    pub fn connection_buffer(mut self, capacity: usize) -> Self {
        self.config.connection_buffer = capacity;
        self
    }

    pub fn retry(mut self, retry: RetrySettings) -> Self {
        self.config.retry = retry;
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<AppConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file: {0}")]
    Parse(String),
    #[error("invalid value for {0}: {1:?}")]
    InvalidValue(&'static str, String),
    #[error("missing value: {0}")]
    MissingValue(&'static str),
}
