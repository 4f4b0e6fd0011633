use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{ClientError, Result};

pub const DEFAULT_API_BASE_URL: &str = "https://api.promptback.app";
pub const DEFAULT_SYNC_INTERVAL_SECS: u64 = 300;

/// Which guest-identity driver this deployment runs. Exactly one driver is
/// constructed per running client; the drivers are alternatives, never
/// composed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IdentityDriver {
    Flat,
    Records,
    Server,
}

impl Default for IdentityDriver {
    fn default() -> Self {
        IdentityDriver::Flat
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    pub version: u32,
    pub api_base_url: String,
    #[serde(default)]
    pub identity_driver: IdentityDriver,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_interval_secs: Option<u64>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            version: 1,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            identity_driver: IdentityDriver::default(),
            data_dir: None,
            sync_interval_secs: None,
        }
    }
}

impl ClientConfig {
    pub fn sync_interval_secs(&self) -> u64 {
        self.sync_interval_secs.unwrap_or(DEFAULT_SYNC_INTERVAL_SECS)
    }

    /// Directory holding config and local identity state.
    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.data_dir {
            return Ok(PathBuf::from(dir));
        }
        default_data_dir()
    }
}

fn default_data_dir() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|h| h.join(".promptback"))
        .ok_or_else(|| ClientError::Storage("Cannot find home directory".into()))
}

fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".promptback").join("config.json"))
}

/// Load the config, falling back to defaults when the file is missing or
/// unreadable.
pub fn load_config() -> ClientConfig {
    let Some(path) = config_path() else {
        return ClientConfig::default();
    };
    let Ok(content) = std::fs::read_to_string(&path) else {
        return ClientConfig::default();
    };
    serde_json::from_str(&content).unwrap_or_default()
}

pub fn save_config(config: &ClientConfig) -> Result<()> {
    let path =
        config_path().ok_or_else(|| ClientError::Storage("Cannot find home directory".into()))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(config)
        .map_err(|e| ClientError::Storage(e.to_string()))?;
    std::fs::write(&path, json)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.identity_driver, IdentityDriver::Flat);
        assert_eq!(config.sync_interval_secs(), DEFAULT_SYNC_INTERVAL_SECS);
    }

    #[test]
    fn test_partial_config_deserializes_with_defaults() {
        let config: ClientConfig =
            serde_json::from_str(r#"{"version":1,"apiBaseUrl":"http://localhost:3000"}"#).unwrap();
        assert_eq!(config.api_base_url, "http://localhost:3000");
        assert_eq!(config.identity_driver, IdentityDriver::Flat);
        assert!(config.sync_interval_secs.is_none());
    }

    #[test]
    fn test_driver_round_trip() {
        let config = ClientConfig {
            identity_driver: IdentityDriver::Server,
            ..ClientConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains(r#""identityDriver":"server""#));
        let back: ClientConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.identity_driver, IdentityDriver::Server);
    }
}
