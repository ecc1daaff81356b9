//! Client config load/save for `~/.travel-chat/config.yaml`.
//! Sections: `backend.*`, `keep_alive.*`, `preferences.*`. Every field is optional.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::messages::{Language, Preferences};

/// Runtime override for the backend base URL.
pub const BASE_URL_ENV: &str = "TRAVEL_API_URL";
/// Runtime override for the config file location.
pub const CONFIG_PATH_ENV: &str = "TRAVEL_CHAT_CONFIG";

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_HEALTH_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// What `start_keep_alive` does when a timer is already armed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeepAliveRestart {
    /// Leave the running timer alone.
    #[default]
    KeepExisting,
    /// Abort the running timer and arm a fresh one.
    Replace,
}

/// Backend section (base_url, timeouts).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackendSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_timeout_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_timeout_ms: Option<u64>,
}

/// Keep-alive section (enabled, interval_secs, restart).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeepAliveSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restart: Option<KeepAliveRestart>,
}

/// Preferences section (language).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreferencesSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<Language>,
}

/// Full config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendSection,
    #[serde(default)]
    pub keep_alive: KeepAliveSection,
    #[serde(default)]
    pub preferences: PreferencesSection,
}

impl Config {
    /// Preferences with defaults applied.
    pub fn preferences(&self) -> Preferences {
        Preferences {
            language: self.preferences.language.unwrap_or_default(),
        }
    }
}

/// Fully resolved settings used to build a [`crate::BackendClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub query_timeout: Duration,
    pub health_timeout: Duration,
    pub keep_alive_interval: Duration,
    /// Arm the keep-alive timer when the client is constructed.
    pub keep_alive_on_start: bool,
    pub keep_alive_restart: KeepAliveRestart,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: build_time_base_url().to_string(),
            query_timeout: DEFAULT_QUERY_TIMEOUT,
            health_timeout: DEFAULT_HEALTH_TIMEOUT,
            keep_alive_interval: DEFAULT_KEEP_ALIVE_INTERVAL,
            keep_alive_on_start: true,
            keep_alive_restart: KeepAliveRestart::default(),
        }
    }
}

impl ClientConfig {
    /// Default settings pointed at `base_url`.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Resolve file values over defaults, then apply the `TRAVEL_API_URL` env override.
    pub fn from_config(config: &Config) -> Self {
        Self::resolve(config, std::env::var(BASE_URL_ENV).ok())
    }

    fn resolve(config: &Config, env_base_url: Option<String>) -> Self {
        let defaults = Self::default();
        let base_url = env_base_url
            .filter(|v| !v.trim().is_empty())
            .or_else(|| config.backend.base_url.clone())
            .unwrap_or(defaults.base_url);

        Self {
            base_url,
            query_timeout: config
                .backend
                .query_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.query_timeout),
            health_timeout: config
                .backend
                .health_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.health_timeout),
            keep_alive_interval: config
                .keep_alive
                .interval_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.keep_alive_interval),
            keep_alive_on_start: config
                .keep_alive
                .enabled
                .unwrap_or(defaults.keep_alive_on_start),
            keep_alive_restart: config
                .keep_alive
                .restart
                .unwrap_or(defaults.keep_alive_restart),
        }
    }
}

/// Base URL baked in at build time via `TRAVEL_API_URL`, else the local dev server.
pub fn build_time_base_url() -> &'static str {
    option_env!("TRAVEL_API_URL").unwrap_or(DEFAULT_BASE_URL)
}

/// Returns the default config file path: `~/.travel-chat/config.yaml` (platform-specific).
pub fn default_config_path() -> Option<PathBuf> {
    let home = home_dir()?;
    Some(home.join(".travel-chat").join("config.yaml"))
}

#[cfg(unix)]
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

#[cfg(windows)]
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("USERPROFILE").map(PathBuf::from)
}

#[cfg(not(any(unix, windows)))]
fn home_dir() -> Option<PathBuf> {
    None
}

/// Load config from a YAML file.
pub fn load(path: &Path) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_yaml::from_str(&contents)?)
}

/// Load config, treating a missing file as the default config.
pub fn load_or_default(path: &Path) -> Result<Config, ConfigError> {
    if path.exists() {
        load(path)
    } else {
        tracing::debug!(path = %path.display(), "config file not found, using defaults");
        Ok(Config::default())
    }
}

/// Save config to a YAML file. Creates parent directory if missing.
pub fn save(path: &Path, config: &Config) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let contents = serde_yaml::to_string(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}
