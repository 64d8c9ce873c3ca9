//! Application configuration management.
//!
//! Configuration is stored at `~/.config/dailypictrack/config.json` and
//! holds the API address, request timeout, where the session token is kept,
//! and the last email used to sign in. `DAILYPICTRACK_API_URL` and
//! `DAILYPICTRACK_TOKEN_BACKEND` override the file.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::ClientConfig;
use crate::auth::{FileTokenStore, KeyringTokenStore, TokenStore};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "dailypictrack";

/// Config file name
const CONFIG_FILE: &str = "config.json";

pub const ENV_API_URL: &str = "DAILYPICTRACK_API_URL";
pub const ENV_TOKEN_BACKEND: &str = "DAILYPICTRACK_TOKEN_BACKEND";

/// Where the session token lives
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenBackend {
    #[default]
    File,
    Keyring,
}

impl std::str::FromStr for TokenBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(TokenBackend::File),
            "keyring" | "keychain" => Ok(TokenBackend::Keyring),
            other => Err(anyhow::anyhow!("Unknown token backend: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub api_base_url: Option<String>,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    #[serde(default)]
    pub token_backend: TokenBackend,
    #[serde(default)]
    pub last_email: Option<String>,
}

impl Config {
    /// Load from disk (defaults if absent), then apply environment overrides
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(&path).context("Failed to read config file")?;
            serde_json::from_str(&contents).context("Failed to parse config file")?
        } else {
            Self::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
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

    /// Apply overrides from `lookup`, normally the process environment
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_API_URL).filter(|u| !u.trim().is_empty()) {
            self.api_base_url = Some(url);
        }
        if let Some(backend) = lookup(ENV_TOKEN_BACKEND).filter(|b| !b.trim().is_empty()) {
            self.token_backend = backend.parse()?;
        }
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Per-user cache directory; usable before any config is loaded
    pub fn default_cache_dir() -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        Self::default_cache_dir()
    }

    pub fn client_config(&self) -> ClientConfig {
        let mut client = ClientConfig::default();
        if let Some(ref url) = self.api_base_url {
            client = client.with_base_url(url.clone());
        }
        if let Some(secs) = self.request_timeout_secs {
            client = client.with_timeout(Duration::from_secs(secs));
        }
        client
    }

    /// Open the configured token store
    pub fn token_store(&self) -> Result<Arc<dyn TokenStore>> {
        Ok(match self.token_backend {
            TokenBackend::File => Arc::new(FileTokenStore::new(self.cache_dir()?)),
            TokenBackend::Keyring => Arc::new(KeyringTokenStore::new()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::client::DEFAULT_BASE_URL;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.token_backend, TokenBackend::File);
        let client = config.client_config();
        assert_eq!(client.base_url, DEFAULT_BASE_URL);
        assert_eq!(client.timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_parse_config_file() {
        let json = r#"{"api_base_url":"http://localhost:5000/api/v1","request_timeout_secs":3,"token_backend":"keyring"}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.token_backend, TokenBackend::Keyring);
        assert_eq!(config.last_email, None);
        let client = config.client_config();
        assert_eq!(client.base_url, "http://localhost:5000/api/v1");
        assert_eq!(client.timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config
            .apply_overrides(|key| match key {
                ENV_API_URL => Some("http://127.0.0.1:9000".to_string()),
                ENV_TOKEN_BACKEND => Some("Keychain".to_string()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.api_base_url.as_deref(), Some("http://127.0.0.1:9000"));
        assert_eq!(config.token_backend, TokenBackend::Keyring);
    }

    #[test]
    fn test_bad_backend_override_is_an_error() {
        let mut config = Config::default();
        let result = config.apply_overrides(|key| {
            (key == ENV_TOKEN_BACKEND).then(|| "floppy".to_string())
        });
        assert!(result.is_err());
    }
}
