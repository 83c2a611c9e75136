//! Partition listing command for hr-metrics

use chrono::NaiveDate;

use crate::config::Config;
use crate::error::{HrError, Result};
use crate::storage;

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| HrError::invalid_param(format!("Invalid date {:?}. Expected YYYY-MM-DD", s)))
}

/// List partition files, optionally restricted to a date range
pub async fn list(config: Config, from: Option<String>, to: Option<String>) -> Result<()> {
    let store = storage::open(&config)?;
    let from = from.as_deref().map(parse_date).transpose()?;
    let to = to.as_deref().map(parse_date).transpose()?;

    let dates: Vec<NaiveDate> = store
        .all_partitions()?
        .into_iter()
        .filter(|d| from.map_or(true, |f| *d >= f) && to.map_or(true, |t| *d <= t))
        .collect();

    if dates.is_empty() {
        println!(
            "No partitions matching {} found in {}",
            store.glob_pattern(),
            store.base_path().display()
        );
        return Ok(());
    }

    println!("{:<12} {:>8}  {}", "Date", "Rows", "File");
    println!("{}", "-".repeat(60));

    for date in dates {
        let rows = store.read_partition(date)?.len();
        println!(
            "{:<12} {:>8}  {}",
            date,
            rows,
            store.partition_path(date).display()
        );
    }

    Ok(())
}
