// SPDX-License-Identifier: MPL-2.0

//! Client configuration: gateway endpoint and canister ids.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

pub const APP_DIR: &str = "plaza";

/// Local replica endpoint used when nothing else is configured.
pub const DEFAULT_GATEWAY: &str = "http://127.0.0.1:4943";
pub const DEFAULT_POST_CANISTER_ID: &str = "rrkah-fqaaa-aaaaa-aaaaq-cai";
pub const DEFAULT_PROFILE_CANISTER_ID: &str = "ryjl3-tyaaa-aaaaa-aaaba-cai";

pub const ENV_GATEWAY_URL: &str = "PLAZA_GATEWAY_URL";
pub const ENV_POST_CANISTER_ID: &str = "PLAZA_POST_CANISTER_ID";
pub const ENV_PROFILE_CANISTER_ID: &str = "PLAZA_PROFILE_CANISTER_ID";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config path error: {0}")]
    Path(String),
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid gateway url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Where the client talks to: the boundary gateway and the two canisters
/// behind it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub gateway_url: Url,
    pub post_canister_id: String,
    pub profile_canister_id: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            gateway_url: Url::parse(DEFAULT_GATEWAY).unwrap(),
            post_canister_id: DEFAULT_POST_CANISTER_ID.to_string(),
            profile_canister_id: DEFAULT_PROFILE_CANISTER_ID.to_string(),
        }
    }
}

impl ClientConfig {
    /// Config file path (~/.config/plaza/config.json).
    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut p| {
            p.push(APP_DIR);
            p.push("config.json");
            p
        })
    }

    /// Load configuration: the config file where present, defaults where
    /// not, and `PLAZA_*` environment variables taking precedence over both.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match Self::config_path() {
            Some(path) => Self::read_file(&path)?,
            None => Self::default(),
        };
        config.apply_env()?;
        Ok(config)
    }

    /// Save configuration to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::config_path()
            .ok_or_else(|| ConfigError::Path("could not determine config directory".to_string()))?;
        self.write_file(&path)
    }

    fn read_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    fn write_file(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(url) = std::env::var(ENV_GATEWAY_URL) {
            self.gateway_url = Url::parse(&url)?;
        }
        if let Ok(id) = std::env::var(ENV_POST_CANISTER_ID) {
            self.post_canister_id = id;
        }
        if let Ok(id) = std::env::var(ENV_PROFILE_CANISTER_ID) {
            self.profile_canister_id = id;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plaza").join("config.json");

        let config = ClientConfig {
            gateway_url: Url::parse("https://icp-api.io").unwrap(),
            post_canister_id: "aaaaa-aa".to_string(),
            profile_canister_id: "ryjl3-tyaaa-aaaaa-aaaba-cai".to_string(),
        };
        config.write_file(&path).unwrap();

        assert_eq!(ClientConfig::read_file(&path).unwrap(), config);
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let config = ClientConfig::read_file(&path).unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.gateway_url.as_str(), "http://127.0.0.1:4943/");
    }

    #[test]
    fn test_env_overrides_take_precedence() {
        // The only test touching these variables, so no cross-test races.
        unsafe {
            std::env::set_var(ENV_GATEWAY_URL, "https://gateway.example");
            std::env::set_var(ENV_POST_CANISTER_ID, "aaaaa-aa");
        }

        let mut config = ClientConfig::default();
        config.apply_env().unwrap();

        assert_eq!(config.gateway_url.as_str(), "https://gateway.example/");
        assert_eq!(config.post_canister_id, "aaaaa-aa");
        // Untouched variables keep their file/default values.
        assert_eq!(config.profile_canister_id, DEFAULT_PROFILE_CANISTER_ID);

        unsafe {
            std::env::remove_var(ENV_GATEWAY_URL);
            std::env::remove_var(ENV_POST_CANISTER_ID);
        }
    }
}
