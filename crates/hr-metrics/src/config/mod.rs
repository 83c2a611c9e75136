//! Engine configuration
//!
//! Every field has a default, so an empty or missing config file is valid.
//!
//! ```toml
//! data_dir = "/var/lib/hr-metrics"
//! batch_size = 100
//! flush_interval_secs = 5
//!
//! [device_priorities]
//! device_a = 1
//! device_b = 2
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{HrError, Result};

/// Default data directory name
const DATA_DIR_NAME: &str = "hr-metrics";

pub const DEFAULT_FILE_PREFIX: &str = "heart_rate_metrics";
pub const DEFAULT_BATCH_SIZE: usize = 100;
pub const DEFAULT_FLUSH_INTERVAL_SECS: u64 = 5;
pub const DEFAULT_MIN_HEART_RATE: i32 = 30;
pub const DEFAULT_MAX_HEART_RATE: i32 = 220;
pub const DEFAULT_MAX_BATCH_READINGS: usize = 1000;

/// Get the default partition directory
/// Returns ~/.local/share/hr-metrics on Unix, ./data if no data dir is known
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|p| p.join(DATA_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from("data"))
}

fn default_device_priorities() -> HashMap<String, u32> {
    HashMap::from([("device_a".to_string(), 1), ("device_b".to_string(), 2)])
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding one Parquet file per calendar date
    pub data_dir: PathBuf,
    /// File name prefix, files are `<prefix>_<YYYY-MM-DD>.parquet`
    pub file_prefix: String,
    /// Buffered reading count that triggers a synchronous flush
    pub batch_size: usize,
    /// Period of the background flush
    pub flush_interval_secs: u64,
    pub min_heart_rate: i32,
    pub max_heart_rate: i32,
    /// Largest batch accepted by `ingest-batch`
    pub max_batch_readings: usize,
    /// Device rank table, lower wins
    pub device_priorities: HashMap<String, u32>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            file_prefix: DEFAULT_FILE_PREFIX.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            flush_interval_secs: DEFAULT_FLUSH_INTERVAL_SECS,
            min_heart_rate: DEFAULT_MIN_HEART_RATE,
            max_heart_rate: DEFAULT_MAX_HEART_RATE,
            max_batch_readings: DEFAULT_MAX_BATCH_READINGS,
            device_priorities: default_device_priorities(),
        }
    }
}

impl Config {
    /// Defaults with a custom data directory
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    /// Load and validate a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            HrError::config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config: Config = toml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if given, otherwise defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(HrError::config("batch_size must be greater than 0"));
        }
        if self.flush_interval_secs == 0 {
            return Err(HrError::config("flush_interval_secs must be greater than 0"));
        }
        if self.min_heart_rate > self.max_heart_rate {
            return Err(HrError::config(format!(
                "min_heart_rate ({}) exceeds max_heart_rate ({})",
                self.min_heart_rate, self.max_heart_rate
            )));
        }
        if self.max_batch_readings == 0 {
            return Err(HrError::config("max_batch_readings must be greater than 0"));
        }
        if self.file_prefix.is_empty() || self.file_prefix.contains(['/', '\\']) {
            return Err(HrError::config(format!(
                "file_prefix {:?} is not a valid file name prefix",
                self.file_prefix
            )));
        }
        Ok(())
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.flush_interval_secs)
    }
}
