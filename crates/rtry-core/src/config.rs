use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::retry::RetryDefaults;
use crate::timeout::Timeout;

/// Which errors the default policy retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwallowMode {
    #[default]
    All,
    None,
}

/// Default retry parameters (`[retry]` section in config.toml).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first. Omit for no bound.
    pub attempts: Option<u32>,
    /// Constant delay between attempts in seconds (e.g. 0.25 = 250ms).
    #[serde(default = "default_delay_secs")]
    pub delay_secs: f64,
    /// Wall-clock bound on the whole retry sequence in seconds.
    pub timeout_secs: Option<f64>,
    #[serde(default)]
    pub swallow: SwallowMode,
}

fn default_delay_secs() -> f64 {
    1.0
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: Some(3),
            delay_secs: default_delay_secs(),
            timeout_secs: None,
            swallow: SwallowMode::All,
        }
    }
}

impl RetryConfig {
    /// Validate and convert into builder defaults.
    pub fn to_defaults(&self) -> Result<RetryDefaults, ConfigError> {
        if self.attempts == Some(0) {
            return Err(ConfigError::ZeroAttempts);
        }
        let delay = Duration::try_from_secs_f64(self.delay_secs).map_err(|_| {
            ConfigError::InvalidDelay {
                attempt: 0,
                value: self.delay_secs,
            }
        })?;
        let timeout = self
            .timeout_secs
            .map(|secs| Timeout::from_secs_f64(secs).map(|t| t.budget()))
            .transpose()?;
        Ok(RetryDefaults {
            attempts: self.attempts,
            delay,
            swallow_all: self.swallow == SwallowMode::All,
            timeout,
        })
    }
}

/// Global configuration loaded from `~/.config/rtry/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RtryConfig {
    #[serde(default)]
    pub retry: RetryConfig,
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("rtry")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<RtryConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = RtryConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from_path(&path)
}

pub fn load_from_path(path: &Path) -> Result<RtryConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    toml::from_str(&data).with_context(|| format!("parsing config {}", path.display()))
}
