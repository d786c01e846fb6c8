//! Application configuration management.
//!
//! Configuration is stored at `~/.config/frothauth/config.json` and can be
//! overridden through the environment (`FROTH_API_URL`, `FROTH_TIMEOUT_SECS`),
//! including a `.env` file in the working directory.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Application name used for config/data directory paths
const APP_NAME: &str = "frothauth";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Default base URL of the authentication service
const DEFAULT_API_URL: &str = "http://localhost:8080/api";

/// HTTP request timeout in seconds.
/// 10s fails fast enough for a responsive UI while tolerating slow links.
const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_url: String,
    pub request_timeout_secs: u64,
    /// Last email used to sign in, so the login form can prefill it.
    pub last_email: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            last_email: None,
        }
    }
}

impl Config {
    /// Load from the config file, then apply environment overrides.
    pub fn load() -> Result<Self> {
        // Pick up a .env file if present
        let _ = dotenvy::dotenv();

        let mut config = match Self::config_path() {
            Ok(path) if path.exists() => {
                let contents = std::fs::read_to_string(&path)?;
                serde_json::from_str(&contents)?
            }
            _ => Self::default(),
        };

        if let Ok(url) = std::env::var("FROTH_API_URL") {
            config.api_url = url;
        }
        if let Ok(secs) = std::env::var("FROTH_TIMEOUT_SECS") {
            match secs.parse() {
                Ok(secs) => config.request_timeout_secs = secs,
                Err(_) => warn!(value = %secs, "ignoring unparseable FROTH_TIMEOUT_SECS"),
            }
        }

        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory for the durable session store; `None` in contexts without
    /// a data directory, in which case the session cannot persist.
    pub fn storage_dir(&self) -> Option<PathBuf> {
        dirs::data_dir().map(|d| d.join(APP_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.request_timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert!(config.last_email.is_none());
    }

    #[test]
    fn test_partial_config_file_fills_in_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"api_url": "https://api.example.com"}"#).unwrap();
        assert_eq!(config.api_url, "https://api.example.com");
        assert_eq!(config.request_timeout_secs, DEFAULT_TIMEOUT_SECS);
    }
}
