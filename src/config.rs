//! Configuration management for the WX server
//!
//! Loads server configuration from a TOML file with per-field defaults, so a
//! missing file or a partial file both produce a runnable server.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::{Error, Result};

/// Main server configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub struct ServerConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub display: DisplaySettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub struct ServerSettings {
    /// TCP listen address for X11 connections
    #[serde(default = "default_listen")]
    pub listen: String,
    /// Maximum number of simultaneous client connections
    #[serde(default = "default_max_clients")]
    pub max_clients: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub struct DisplaySettings {
    /// Screen width in pixels
    #[serde(default = "default_width")]
    pub width: u16,
    /// Screen height in pixels
    #[serde(default = "default_height")]
    pub height: u16,
    /// Vendor string reported in the setup response
    #[serde(default = "default_vendor")]
    pub vendor: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub struct LoggingSettings {
    /// Log level when RUST_LOG is not set (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_listen() -> String {
    "127.0.0.1:6000".to_string()
}

fn default_max_clients() -> usize {
    64
}

fn default_width() -> u16 {
    1024
}

fn default_height() -> u16 {
    768
}

fn default_vendor() -> String {
    "sshterm".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            max_clients: default_max_clients(),
        }
    }
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            vendor: default_vendor(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        toml::from_str(&content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Load from an optional path, falling back to defaults when absent
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load_from_file(p),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.display.width, 1024);
        assert_eq!(config.display.height, 768);
        assert_eq!(config.display.vendor, "sshterm");
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: ServerConfig = toml::from_str("[display]\nwidth = 800\n").unwrap();
        assert_eq!(config.display.width, 800);
        assert_eq!(config.display.height, 768);
        assert_eq!(config.server.max_clients, 64);
    }
}
