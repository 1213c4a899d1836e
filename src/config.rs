//! Configuration loading and validation
//!
//! Deployments override the built-in defaults through a TOML file; every
//! field is optional and falls back to the constants the subsystems ship
//! with. A missing file is not an error for the daemon, which then runs
//! entirely on defaults.

use crate::constants::{popularity, session};
use anyhow::Result;
use serde::{Deserialize, Serialize};

fn default_session_capacity() -> usize {
    session::RECENT_CAPACITY
}

fn default_sweep_batch() -> usize {
    session::SWEEP_BATCH_MAX
}

fn default_decay_interval_secs() -> u64 {
    popularity::DECAY_INTERVAL.as_secs()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub session: SessionConfig,
    pub popularity: PopularityConfig,
    pub scheduler: SchedulerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            popularity: PopularityConfig::default(),
            scheduler: SchedulerConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    /// Maximum number of sessions kept before the sweeper evicts
    pub capacity: usize,
    /// Sessions evicted per sweep iteration at most
    pub sweep_batch: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            capacity: default_session_capacity(),
            sweep_batch: default_sweep_batch(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PopularityConfig {
    /// Seconds between decay passes over the popularity index
    pub decay_interval_secs: u64,
}

impl Default for PopularityConfig {
    fn default() -> Self {
        Self {
            decay_interval_secs: default_decay_interval_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Optional JSON file of inventory rows (`{"<row id>": <snapshot>}`)
    /// served by the daemon's built-in inventory; the row re-cache driver
    /// only starts when this is set
    pub snapshot_path: Option<String>,
}

impl Config {
    /// Reject configurations no subsystem could run with
    pub fn validate(&self) -> Result<()> {
        if self.session.sweep_batch == 0 {
            anyhow::bail!("session.sweep_batch must be at least 1");
        }
        if self.popularity.decay_interval_secs == 0 {
            anyhow::bail!("popularity.decay_interval_secs must be at least 1");
        }
        Ok(())
    }
}

/// Load and validate configuration from a TOML file
///
/// A file that exists but fails to parse or validate is an error; silently
/// masking a broken config would be worse than refusing to start.
pub fn load_config(path: &str) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path, e))?;
    let config: Config = toml::from_str(&content)
        .map_err(|e| anyhow::anyhow!("Failed to parse config file '{}': {}", path, e))?;
    config.validate()?;
    Ok(config)
}
