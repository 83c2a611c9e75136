//! Command-line front end
//!
//! Plays the role of the request layer: it validates input, calls the engine
//! and renders results.

pub mod commands;

use std::path::PathBuf;

use crate::config::Config;
use crate::error::Result;

/// Output format for query results
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Csv,
}

/// Load the config file (if any) and apply the data directory override
pub fn load_config(path: Option<PathBuf>, data_dir: Option<PathBuf>) -> Result<Config> {
    let mut config = Config::load_or_default(path.as_deref())?;
    if let Some(dir) = data_dir {
        config.data_dir = dir;
    }
    Ok(config)
}
