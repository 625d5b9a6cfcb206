//! Configuration for pollsafe
//!
//! Two layers of configuration, both read from JSON:
//! - [`SafeConfig`]: the settings object handed to `DataSafe::load_config`
//! - [`ServiceConfig`]: which backend to use and where its settings live

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SafeError};

/// Below this ratio most of the cache is discarded on every clear cycle.
pub const LOW_CLEAR_RATIO: f64 = 0.5;

/// Longest accepted clear or disc-sync interval: one year, in minutes
pub const MAX_INTERVAL_MINUTES: u64 = 365 * 24 * 60;

/// Settings for the file-backed data safe
///
/// Field names on the wire are PascalCase:
/// ```json
/// {
///   "ClearInterval": 15,
///   "ClearAfterRatio": 0.75,
///   "MaximumMemory": 500,
///   "DiscSyncInterval": 5,
///   "Path": "./data"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SafeConfig {
    // -------------------------------------------------------------------------
    // Eviction
    // -------------------------------------------------------------------------
    /// Minutes between eviction checks
    pub clear_interval: u64,

    /// Fraction of `maximum_memory` kept in memory after an eviction
    pub clear_after_ratio: f64,

    /// Hot record count above which eviction starts
    pub maximum_memory: usize,

    // -------------------------------------------------------------------------
    // Durability
    // -------------------------------------------------------------------------
    /// Minutes between full syncs to disk (0 disables syncing)
    pub disc_sync_interval: u64,

    /// Directory holding one file per poll
    pub path: PathBuf,
}

impl Default for SafeConfig {
    fn default() -> Self {
        Self {
            clear_interval: 15,
            clear_after_ratio: 0.75,
            maximum_memory: 500,
            disc_sync_interval: 5,
            path: PathBuf::from("./pollsafe_data"),
        }
    }
}

impl SafeConfig {
    /// Create a new config builder
    pub fn builder() -> SafeConfigBuilder {
        SafeConfigBuilder::default()
    }

    /// Parse and validate settings from JSON
    pub fn from_json(data: &[u8]) -> Result<Self> {
        let config: SafeConfig = serde_json::from_slice(data)?;
        config.validate()?;
        Ok(config)
    }

    /// Encode settings as JSON (the inverse of `from_json`)
    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// Check that every value is in range
    pub fn validate(&self) -> Result<()> {
        if self.maximum_memory == 0 {
            return Err(SafeError::Config(
                "MaximumMemory must be positive".to_string(),
            ));
        }
        if self.clear_interval == 0 {
            return Err(SafeError::Config(
                "ClearInterval must be positive".to_string(),
            ));
        }
        if self.clear_interval > MAX_INTERVAL_MINUTES {
            return Err(SafeError::Config(format!(
                "ClearInterval must be at most {} minutes, got {}",
                MAX_INTERVAL_MINUTES, self.clear_interval
            )));
        }
        if self.disc_sync_interval > MAX_INTERVAL_MINUTES {
            return Err(SafeError::Config(format!(
                "DiscSyncInterval must be at most {} minutes, got {}",
                MAX_INTERVAL_MINUTES, self.disc_sync_interval
            )));
        }
        if !(0.0..=1.0).contains(&self.clear_after_ratio) {
            return Err(SafeError::Config(format!(
                "ClearAfterRatio must be between 0.0 and 1.0, got {}",
                self.clear_after_ratio
            )));
        }
        if self.path.as_os_str().is_empty() {
            return Err(SafeError::Config("Path must not be empty".to_string()));
        }
        Ok(())
    }

    /// Whether the ratio throws away most of the cache on each clear cycle
    pub fn is_low_ratio(&self) -> bool {
        self.clear_after_ratio < LOW_CLEAR_RATIO
    }

    /// Number of hot records left after an eviction pass
    pub fn eviction_target(&self) -> usize {
        (self.maximum_memory as f64 * self.clear_after_ratio).ceil() as usize
    }

    /// Clamped to [`MAX_INTERVAL_MINUTES`], even for unvalidated settings
    pub fn clear_period(&self) -> Duration {
        minutes_to_period(self.clear_interval)
    }

    /// `None` when periodic syncing is disabled
    pub fn sync_period(&self) -> Option<Duration> {
        match self.disc_sync_interval {
            0 => None,
            minutes => Some(minutes_to_period(minutes)),
        }
    }
}

fn minutes_to_period(minutes: u64) -> Duration {
    Duration::from_secs(minutes.min(MAX_INTERVAL_MINUTES) * 60)
}

/// Builder for SafeConfig
#[derive(Default)]
pub struct SafeConfigBuilder {
    config: SafeConfig,
}

impl SafeConfigBuilder {
    /// Set the storage directory
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.path = path.into();
        self
    }

    /// Set the eviction check interval (in minutes)
    pub fn clear_interval(mut self, minutes: u64) -> Self {
        self.config.clear_interval = minutes;
        self
    }

    /// Set the fraction of the memory bound kept after eviction
    pub fn clear_after_ratio(mut self, ratio: f64) -> Self {
        self.config.clear_after_ratio = ratio;
        self
    }

    /// Set the hot record count threshold
    pub fn maximum_memory(mut self, count: usize) -> Self {
        self.config.maximum_memory = count;
        self
    }

    /// Set the full sync interval (in minutes, 0 disables)
    pub fn disc_sync_interval(mut self, minutes: u64) -> Self {
        self.config.disc_sync_interval = minutes;
        self
    }

    pub fn build(self) -> SafeConfig {
        self.config
    }
}

/// Service-level configuration: which data safe to run and how
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceConfig {
    /// Registry name of the backend
    pub data_safe: String,

    /// Path to the backend's own settings file
    pub data_safe_config: PathBuf,

    /// Run garbage collection once the backend is loaded
    #[serde(default, rename = "RunGCOnStart")]
    pub run_gc_on_start: bool,
}

impl ServiceConfig {
    /// Read a service config from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read(path).map_err(|e| {
            SafeError::Config(format!("can not read {}: {}", path.display(), e))
        })?;
        let config: ServiceConfig = serde_json::from_slice(&data)?;
        Ok(config)
    }

    /// Read the backend settings file this config points at
    ///
    /// A relative path is resolved against `base`, normally the directory
    /// holding the service config.
    pub fn read_backend_settings(&self, base: &Path) -> Result<Vec<u8>> {
        let path = if self.data_safe_config.is_absolute() {
            self.data_safe_config.clone()
        } else {
            base.join(&self.data_safe_config)
        };
        fs::read(&path).map_err(|e| {
            SafeError::Config(format!("can not read {}: {}", path.display(), e))
        })
    }
}
