//! Configuration loading for numduel peers.
//!
//! Configuration is loaded from a TOML file (default: `numduel.toml`). Every
//! section and field is optional; missing values take the defaults below.

use numduel_core::{DeckConfig, RulesConfig};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration for a numduel peer.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PeerConfig {
    /// Network configuration.
    #[serde(default)]
    pub network: NetworkConfig,
    /// Timeout configuration.
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    /// Game rules. Only the host's values shape the deal.
    #[serde(default)]
    pub rules: RulesConfig,
    /// Deck composition. Read by the host only.
    #[serde(default)]
    pub deck: DeckConfig,
}

/// Network configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    /// Address the host listens on (default: 0.0.0.0:7777).
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Address the client connects to (default: 127.0.0.1:7777).
    #[serde(default = "default_connect_address")]
    pub connect_address: String,
    /// Fixed RNG seed for the host's deal (optional, random if missing).
    pub seed: Option<u64>,
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TimeoutConfig {
    /// Seconds a draw or target request may stay unanswered (default: 10).
    /// Past this the session is aborted as unresponsive.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Seconds to wait for the TCP connect (default: 5).
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

// Default value functions
fn default_bind_address() -> String {
    "0.0.0.0:7777".to_string()
}

fn default_connect_address() -> String {
    "127.0.0.1:7777".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_connect_timeout_secs() -> u64 {
    5
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            connect_address: default_connect_address(),
            seed: None,
        }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl TimeoutConfig {
    /// The request deadline as a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// The connect deadline as a [`Duration`].
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl PeerConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// `[deck]` section describes a deck that cannot be dealt.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;
        config
            .deck
            .validate()
            .map_err(|reason| ConfigError::InvalidDeck {
                path: path.to_path_buf(),
                reason,
            })?;
        Ok(config)
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
    /// The `[deck]` section cannot be dealt.
    #[error("invalid [deck] in {path}: {reason}")]
    InvalidDeck {
        /// Path to the configuration file.
        path: PathBuf,
        /// What is wrong with the composition.
        reason: String,
    },
}
