#![deny(unsafe_code)]

//! Configuration loading and validation for Hermit.
//!
//! Loads TOML configuration files and validates them against expected
//! schemas. Provides the [`AppConfig`] type as the central configuration
//! structure shared by the CLI and the core image-daemon client.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

/// Top-level application configuration.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Image daemon endpoint configuration.
    #[serde(default)]
    pub daemon: DaemonConfig,

    /// Image build defaults.
    #[serde(default)]
    pub build: BuildConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Configuration for reaching the image daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Unix socket path the daemon listens on.
    #[serde(default = "default_socket_path")]
    pub socket_path: String,

    /// Path to the docker client binary, used for the availability
    /// gate check and for delegated client invocations.
    #[serde(default = "default_docker_bin")]
    pub docker_bin: String,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            socket_path: default_socket_path(),
            docker_bin: default_docker_bin(),
        }
    }
}

fn default_socket_path() -> String {
    "/var/run/docker.sock".to_string()
}

fn default_docker_bin() -> String {
    "docker".to_string()
}

/// Default options applied to image builds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Suppress the daemon's build transcript on the client side.
    #[serde(default)]
    pub quiet_client: bool,

    /// Let the daemon reuse cached layers.
    #[serde(default = "default_use_cache")]
    pub use_cache: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            quiet_client: false,
            use_cache: default_use_cache(),
        }
    }
}

fn default_use_cache() -> bool {
    true
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g. "info", "debug", "trace").
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Load configuration from a TOML file at the given path using async I/O.
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = tokio::fs::read_to_string(path).await?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.daemon.socket_path.is_empty() {
            return Err(ConfigError::Validation(
                "daemon.socket_path must not be empty".to_string(),
            ));
        }
        if self.daemon.docker_bin.is_empty() {
            return Err(ConfigError::Validation(
                "daemon.docker_bin must not be empty".to_string(),
            ));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::Validation(format!(
                "logging.level must be one of {:?}, got {:?}",
                valid_levels, self.logging.level
            )));
        }

        Ok(())
    }
}
