//! Application configuration management.
//!
//! This module handles loading and saving the application configuration:
//! API host, timeouts, where credentials live, and the last used email.
//!
//! Configuration is stored at `~/.config/morasel/config.json`. A few fields
//! can be overridden from the environment (`MORASEL_API_URL`,
//! `MORASEL_TIMEOUT_SECS`, `MORASEL_CREDENTIAL_BACKEND`, `MORASEL_DATA_DIR`).

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::api::{DEFAULT_BASE_URL, REQUEST_TIMEOUT_SECS};
use crate::auth::session::DEFAULT_RESTORE_TIMEOUT;
use crate::services::DEFAULT_POLL_INTERVAL;

/// Application name used for config/data directory paths
const APP_NAME: &str = "morasel";

/// Config file name
const CONFIG_FILE: &str = "config.json";

const ENV_API_URL: &str = "MORASEL_API_URL";
const ENV_TIMEOUT: &str = "MORASEL_TIMEOUT_SECS";
const ENV_BACKEND: &str = "MORASEL_CREDENTIAL_BACKEND";
const ENV_DATA_DIR: &str = "MORASEL_DATA_DIR";

/// Where the session's credentials are persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialBackendKind {
    /// OS keychain
    #[default]
    Keyring,
    /// `credentials.json` in the data directory
    File,
    /// Process memory; nothing survives a restart
    Memory,
}

impl std::str::FromStr for CredentialBackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keyring" => Ok(Self::Keyring),
            "file" => Ok(Self::File),
            "memory" => Ok(Self::Memory),
            other => Err(format!("unknown credential backend: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    pub credential_backend: CredentialBackendKind,
    pub data_dir: Option<PathBuf>,
    pub poll_interval_secs: u64,
    pub restore_timeout_secs: u64,
    pub last_email: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: REQUEST_TIMEOUT_SECS,
            credential_backend: CredentialBackendKind::default(),
            data_dir: None,
            poll_interval_secs: DEFAULT_POLL_INTERVAL.as_secs(),
            restore_timeout_secs: DEFAULT_RESTORE_TIMEOUT.as_secs(),
            last_email: None,
        }
    }
}

impl Config {
    /// Load from the default path, then apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load from `path`, or defaults when it does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Apply overrides read through `var`. Invalid values are ignored with a warning.
    pub fn apply_overrides<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = var(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
            self.api_base_url = url.trim().to_string();
        }
        if let Some(raw) = var(ENV_TIMEOUT) {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => self.request_timeout_secs = secs,
                _ => warn!(value = %raw, "Ignoring invalid {}", ENV_TIMEOUT),
            }
        }
        if let Some(raw) = var(ENV_BACKEND) {
            match raw.parse() {
                Ok(kind) => self.credential_backend = kind,
                Err(e) => warn!(error = %e, "Ignoring invalid {}", ENV_BACKEND),
            }
        }
        if let Some(dir) = var(ENV_DATA_DIR).filter(|v| !v.trim().is_empty()) {
            self.data_dir = Some(PathBuf::from(dir));
        }
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory for the credentials file and logs.
    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.data_dir {
            return Ok(dir.clone());
        }
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    pub fn restore_timeout(&self) -> Duration {
        Duration::from_secs(self.restore_timeout_secs.max(1))
    }
}
