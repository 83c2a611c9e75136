//! Storage layer for heart-rate readings
//!
//! This module provides date-partitioned Parquet storage, enabling concurrent
//! read access while ingestion keeps appending.
//!
//! ## Storage Layout
//!
//! ```text
//! <data_dir>/
//! ├── heart_rate_metrics_2024-01-15.parquet   # Daily partitions (UTC date)
//! ├── heart_rate_metrics_2024-01-16.parquet
//! └── ...
//! ```
//!
//! Every file has the columns `device_id`, `user_id`, `timestamp`,
//! `heart_rate` and `date`.
//!
//! ## Concurrent Access
//!
//! Partition files are rewritten atomically (temp file + rename), so readers
//! always see a complete version. External tools can scan the whole store:
//!
//! ```sql
//! SELECT * FROM 'heart_rate_metrics_*.parquet' WHERE user_id = 'u1';
//! ```

mod parquet;
mod partitions;

pub use parquet::PartitionStore;
pub use partitions::{date_range, PartitionNaming};

use crate::config::Config;
use crate::error::Result;

/// Open the partition store described by `config`, creating its directory
pub fn open(config: &Config) -> Result<PartitionStore> {
    let store = PartitionStore::new(&config.data_dir, config.file_prefix.clone());
    store.ensure_dir()?;
    Ok(store)
}
