//! Session configuration
//!
//! A [`SessionConfig`] carries everything needed to open a session:
//! host, port, terminal model, and the timeouts applied while
//! connecting and waiting on the host. Configurations serialize to
//! JSON and load from a per-user file, so scripted runs can keep their
//! connection settings out of the command line.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::display::ScreenSize;
use crate::error::{TN3270Error, TN3270Result};

/// Environment variable overriding the default configuration path
pub const CONFIG_PATH_ENV: &str = "TN3270R_CONFIG";

/// Default TN3270 port
pub const DEFAULT_PORT: u16 = 23;
/// Default TCP connect timeout in seconds
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;
/// Default timeout for waits on host output in seconds
pub const DEFAULT_WAIT_TIMEOUT_SECS: u64 = 30;

/// Connection settings for one TN3270 session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub terminal_model: ScreenSize,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_wait_timeout")]
    pub wait_timeout_secs: u64,
}

fn default_connect_timeout() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}

fn default_wait_timeout() -> u64 {
    DEFAULT_WAIT_TIMEOUT_SECS
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: DEFAULT_PORT,
            terminal_model: ScreenSize::default(),
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            wait_timeout_secs: DEFAULT_WAIT_TIMEOUT_SECS,
        }
    }
}

impl SessionConfig {
    /// Configuration for `host:port` with default model and timeouts
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    /// Check the configuration before it is used to connect
    pub fn validate(&self) -> TN3270Result<()> {
        if self.host.is_empty() {
            return Err(TN3270Error::invalid_input("host must not be empty"));
        }
        if self.host.len() > 253 {
            return Err(TN3270Error::invalid_input(
                "host exceeds the 253 character limit for a hostname",
            ));
        }
        if self.port == 0 {
            return Err(TN3270Error::invalid_input("port must not be zero"));
        }
        if self.connect_timeout_secs == 0 {
            return Err(TN3270Error::invalid_input(
                "connect timeout must be at least one second",
            ));
        }
        Ok(())
    }

    pub fn to_json(&self) -> TN3270Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| TN3270Error::InvalidInput {
            reason: format!("failed to serialize configuration: {e}"),
        })
    }

    pub fn from_json(json: &str) -> TN3270Result<Self> {
        serde_json::from_str(json).map_err(|e| TN3270Error::InvalidInput {
            reason: format!("failed to parse configuration: {e}"),
        })
    }

    /// Write the configuration as JSON, creating parent directories
    pub fn save_to(&self, path: impl AsRef<Path>) -> TN3270Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn load_from(path: impl AsRef<Path>) -> TN3270Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_json(&content)
    }
}

/// Where the configuration lives by default
///
/// `TN3270R_CONFIG` overrides everything. Otherwise the per-user
/// configuration directory is used, falling back to the working
/// directory on platforms without one.
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        return PathBuf::from(path);
    }
    dirs::config_dir()
        .map(|dir| dir.join("tn3270r").join("session.json"))
        .unwrap_or_else(|| PathBuf::from("session.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_configuration() {
        let config = SessionConfig::default();
        assert_eq!(config.port, 23);
        assert_eq!(config.terminal_model, ScreenSize::Model2);
        assert_eq!(config.connect_timeout_secs, 30);
        assert_eq!(config.wait_timeout_secs, 30);
    }

    #[test]
    fn test_validation() {
        assert!(SessionConfig::new("mainframe.example.com", 23).validate().is_ok());
        assert!(SessionConfig::new("", 23).validate().is_err());
        assert!(SessionConfig::new("host", 0).validate().is_err());
        assert!(SessionConfig::new("h".repeat(254), 23).validate().is_err());

        let mut config = SessionConfig::new("host", 23);
        config.connect_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_json_round_trip() {
        let mut config = SessionConfig::new("mvs.example.com", 3270);
        config.terminal_model = ScreenSize::Model4;
        config.wait_timeout_secs = 45;
        let json = config.to_json().unwrap();
        let restored = SessionConfig::from_json(&json).unwrap();
        assert_eq!(restored, config);
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let config =
            SessionConfig::from_json(r#"{"host": "mvs.example.com", "port": 23}"#).unwrap();
        assert_eq!(config.terminal_model, ScreenSize::Model2);
        assert_eq!(config.connect_timeout_secs, 30);
        assert_eq!(config.wait_timeout_secs, 30);
    }

    #[test]
    fn test_malformed_json_is_rejected() {
        assert!(SessionConfig::from_json("not json").is_err());
        assert!(SessionConfig::from_json(r#"{"port": 23}"#).is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");
        let config = SessionConfig::new("tso.example.com", 992);
        config.save_to(&path).unwrap();
        let restored = SessionConfig::load_from(&path).unwrap();
        assert_eq!(restored, config);
    }
}
