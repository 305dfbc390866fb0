//! Environment configuration

use std::path::Path;
use std::time::Duration;

use eg_core::ActionSpace;
use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};

/// How to reach the emulator and which action space to expose
///
/// Every field has a default, so a config file only needs the fields it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvConfig {
    /// Bridge host for the line transport
    pub host: String,
    /// Bridge port for the line transport
    pub port: u16,
    /// Connect timeout in milliseconds
    pub connect_timeout_ms: u64,
    pub action_space: ActionSpace,
    /// ROM for the in-process emulator
    pub rom_path: Option<String>,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9999,
            connect_timeout_ms: 5000,
            action_space: ActionSpace::Discrete,
            rom_path: None,
        }
    }
}

impl EnvConfig {
    /// Load a JSON config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|source| BridgeError::Config {
            path: path.display().to_string(),
            source,
        })
    }

    /// `host:port` of the bridge
    pub fn bridge_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}
