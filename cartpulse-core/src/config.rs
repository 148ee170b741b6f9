//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/cartpulse/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/cartpulse/` (~/.config/cartpulse/)
//! - Data: `$XDG_DATA_HOME/cartpulse/` (~/.local/share/cartpulse/)
//! - State/Logs: `$XDG_STATE_HOME/cartpulse/` (~/.local/state/cartpulse/)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_DATA_HOME or ~/.local/share
fn xdg_data_home() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/share"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Conversion relay configuration (optional)
    #[serde(default)]
    pub relay: RelayConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Address the server binds to
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Bearer token required by the dashboard-summary endpoint.
    ///
    /// Stand-in for the platform's admin session middleware, which is
    /// an external collaborator. When unset, the endpoint rejects all
    /// callers.
    pub admin_token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            admin_token: None,
        }
    }
}

fn default_bind_addr() -> String {
    "127.0.0.1:8080".to_string()
}

/// Conversion relay configuration
///
/// When enabled, cartpulse forwards every ingested event to the
/// external conversion-tracking API in addition to storing it locally.
#[derive(Debug, Deserialize, Clone)]
pub struct RelayConfig {
    /// Enable/disable the relay leg
    #[serde(default)]
    pub enabled: bool,

    /// Conversion API endpoint (e.g., `https://graph.facebook.com/v18.0/<pixel_id>/events`)
    pub endpoint_url: Option<String>,

    /// API access token
    pub access_token: Option<String>,

    /// Site origin joined with event paths to build `event_source_url`
    /// (e.g., `https://shop.example.com`)
    #[serde(default = "default_site_origin")]
    pub site_origin: String,

    /// HTTP request timeout in seconds
    #[serde(default = "default_relay_timeout")]
    pub timeout_secs: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint_url: None,
            access_token: None,
            site_origin: default_site_origin(),
            timeout_secs: default_relay_timeout(),
        }
    }
}

impl RelayConfig {
    /// Check if the relay is properly configured and enabled
    pub fn is_ready(&self) -> bool {
        self.enabled && self.endpoint_url.is_some() && self.access_token.is_some()
    }

    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        if self.endpoint_url.is_none() {
            return Err(Error::Config(
                "relay.endpoint_url is required when relay is enabled".to_string(),
            ));
        }
        if self.access_token.is_none() {
            return Err(Error::Config(
                "relay.access_token is required when relay is enabled".to_string(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(Error::Config(
                "relay.timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_site_origin() -> String {
    "http://localhost:3000".to_string()
}

fn default_relay_timeout() -> u64 {
    10
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of rolled log files to keep; 0 disables pruning
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        config.relay.validate()?;

        Ok(config)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/cartpulse/config.toml` (~/.config/cartpulse/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("cartpulse").join("config.toml")
    }

    /// Returns the data directory path (for the SQLite database)
    ///
    /// `$XDG_DATA_HOME/cartpulse/` (~/.local/share/cartpulse/)
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("cartpulse")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/cartpulse/` (~/.local/state/cartpulse/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("cartpulse")
    }

    /// Returns the database file path
    ///
    /// `$XDG_DATA_HOME/cartpulse/data.db` (~/.local/share/cartpulse/data.db)
    pub fn database_path() -> PathBuf {
        Self::data_dir().join("data.db")
    }

    /// Returns the log file path
    ///
    /// `$XDG_STATE_HOME/cartpulse/cartpulse.log` (~/.local/state/cartpulse/cartpulse.log)
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("cartpulse.log")
    }
}
