//! Configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::preemption::PreemptMode;
use crate::watcher::WatcherConfig;

/// Environment variables that override file configuration
pub const ENV_MASTER_URL: &str = "PREEMPT_MASTER_URL";
pub const ENV_ALLOCATION_ID: &str = "PREEMPT_ALLOCATION_ID";
pub const ENV_RANK: &str = "PREEMPT_RANK";
pub const ENV_MODE: &str = "PREEMPT_MODE";

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Master connection
    pub master: MasterConfig,

    /// Allocation this process belongs to
    #[serde(rename = "allocation-id")]
    pub allocation_id: String,

    /// This process's rank in the worker group
    pub rank: usize,

    /// Synchronization mode for should_preempt()
    pub mode: PreemptMode,

    /// Whether a master manages this task; unmanaged runs never preempt
    pub managed: bool,

    /// Long-poll tuning
    pub watcher: WatcherConfig,

    /// Seconds between checks in `pc watch`
    #[serde(rename = "check-interval-secs")]
    pub check_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            master: MasterConfig::default(),
            allocation_id: String::new(),
            rank: 0,
            mode: PreemptMode::default(),
            managed: true,
            watcher: WatcherConfig::default(),
            check_interval_secs: 10,
        }
    }
}

impl Config {
    /// Validate configuration before use
    ///
    /// A managed task needs a master URL and an allocation id.
    pub fn validate(&self) -> Result<()> {
        if !self.managed {
            return Ok(());
        }
        if self.master.url.is_empty() {
            return Err(eyre::eyre!("Master URL not set. Set master.url or {}.", ENV_MASTER_URL));
        }
        if self.allocation_id.is_empty() {
            return Err(eyre::eyre!(
                "Allocation id not set. Set allocation-id or {}.",
                ENV_ALLOCATION_ID
            ));
        }
        Ok(())
    }

    /// Load configuration with fallback chain, then apply environment overrides
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        let mut config = Self::load_file(config_path)?;
        config.apply_env()?;
        Ok(config)
    }

    fn load_file(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .preempt.yml
        let local_config = PathBuf::from(".preempt.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/preempt/preempt.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("preempt").join("preempt.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Override fields from `PREEMPT_*` environment variables
    pub fn apply_env(&mut self) -> Result<()> {
        if let Ok(url) = std::env::var(ENV_MASTER_URL) {
            self.master.url = url;
        }
        if let Ok(allocation_id) = std::env::var(ENV_ALLOCATION_ID) {
            self.allocation_id = allocation_id;
        }
        if let Ok(rank) = std::env::var(ENV_RANK) {
            self.rank = rank
                .trim()
                .parse()
                .context(format!("Invalid {}: {}", ENV_RANK, rank))?;
        }
        if let Ok(mode) = std::env::var(ENV_MODE) {
            self.mode = mode.parse().map_err(|e: String| eyre::eyre!(e))?;
        }
        Ok(())
    }

    /// Get the watch-loop check interval as a Duration
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }
}

/// Master connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MasterConfig {
    /// Base URL of the master
    pub url: String,

    /// Environment variable holding a bearer token, if the master wants one
    #[serde(rename = "token-env")]
    pub token_env: Option<String>,
}

impl Default for MasterConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8080".to_string(),
            token_env: Some("PREEMPT_MASTER_TOKEN".to_string()),
        }
    }
}

impl MasterConfig {
    /// Read the bearer token from the configured environment variable
    pub fn get_token(&self) -> Option<String> {
        let var = self.token_env.as_ref()?;
        std::env::var(var).ok().filter(|token| !token.is_empty())
    }
}
