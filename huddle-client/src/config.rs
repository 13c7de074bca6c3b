use huddle_core::IceServerConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_SIGNALING_URL: &str = "ws://127.0.0.1:8080/ws";
pub const DEFAULT_STUN_ADDR: &str = "stun:stun.l.google.com:19302";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Client settings. Every field is optional in the JSON form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClientConfig {
    pub signaling_url: String,
    pub ice_servers: Vec<IceServerConfig>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            signaling_url: DEFAULT_SIGNALING_URL.to_owned(),
            ice_servers: vec![IceServerConfig::stun(DEFAULT_STUN_ADDR)],
        }
    }
}

impl ClientConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn with_signaling_url(mut self, url: impl Into<String>) -> Self {
        self.signaling_url = url.into();
        self
    }
}
