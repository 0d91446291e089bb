use serde::Deserialize;
use std::{fs, path::Path};

use crate::errors::{NotifyError, Result};

/// Environment variable that overrides the config.json location.
pub const CONFIG_ENV: &str = "NOTIFYD_CONFIG";

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// HTTP port to listen on.
    pub port: u16,

    /// Log level for tracing (e.g. "info", "debug").
    pub log_level: String,

    pub server_version: String,

    /// Seconds between keep-alive pings on subscription sockets.
    #[serde(default = "default_ping_interval")]
    pub ws_ping_interval_secs: u64,
}

fn default_ping_interval() -> u64 {
    30
}

impl AppConfig {
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = fs::read_to_string(path).map_err(|source| NotifyError::ConfigRead {
            path: path.display().to_string(),
            source,
        })?;

        Self::from_json(&file).map_err(|source| NotifyError::ConfigParse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn from_json(text: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str::<AppConfig>(text)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            log_level: "info".to_string(),
            server_version: env!("CARGO_PKG_VERSION").to_string(),
            ws_ping_interval_secs: default_ping_interval(),
        }
    }
}
