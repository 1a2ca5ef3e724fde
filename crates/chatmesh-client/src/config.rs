//! Client configuration.
//!
//! Configuration can be loaded from:
//! - Environment variables (CHATMESH_*)
//! - TOML configuration file

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Room to join.
    #[serde(default = "default_room")]
    pub room: String,

    /// Fixed nickname. When absent a random `Anon#####` is generated.
    #[serde(default)]
    pub nick: Option<String>,

    /// Typing-ellipsis ticker period in milliseconds.
    #[serde(default = "default_ticker_interval")]
    pub ticker_interval_ms: u64,
}

// Default value functions
fn default_room() -> String {
    std::env::var("CHATMESH_ROOM").unwrap_or_else(|_| "chatmesh-demo".to_string())
}

fn default_ticker_interval() -> u64 {
    1_000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            room: default_room(),
            nick: None,
            ticker_interval_ms: default_ticker_interval(),
        }
    }
}

impl Config {
    /// Load configuration from file or defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be parsed.
    pub fn load() -> Result<Self> {
        let config_paths = [
            "chatmesh.toml",
            "/etc/chatmesh/chatmesh.toml",
            "~/.config/chatmesh/chatmesh.toml",
        ];

        for path in &config_paths {
            let expanded = shellexpand::tilde(path);
            if Path::new(expanded.as_ref()).exists() {
                return Self::from_file(expanded.as_ref());
            }
        }

        // Fall back to defaults with environment overrides
        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }
}
