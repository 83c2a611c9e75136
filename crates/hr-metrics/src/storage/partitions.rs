//! Partition naming and date range calculation for daily Parquet files

use chrono::NaiveDate;

const EXTENSION: &str = "parquet";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Naming scheme for daily partitions: `<prefix>_<YYYY-MM-DD>.parquet`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionNaming {
    prefix: String,
}

impl PartitionNaming {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Partition key for a given date (YYYY-MM-DD)
    pub fn partition_key(date: NaiveDate) -> String {
        date.format(DATE_FORMAT).to_string()
    }

    /// File name of the partition holding `date`
    pub fn file_name(&self, date: NaiveDate) -> String {
        format!("{}_{}.{}", self.prefix, Self::partition_key(date), EXTENSION)
    }

    /// Recover the partition date from a file name, `None` for foreign files
    pub fn parse_file_name(&self, name: &str) -> Option<NaiveDate> {
        let rest = name.strip_prefix(self.prefix.as_str())?.strip_prefix('_')?;
        let key = rest.strip_suffix(EXTENSION)?.strip_suffix('.')?;
        NaiveDate::parse_from_str(key, DATE_FORMAT).ok()
    }

    /// Glob pattern matching every partition, for external readers
    pub fn glob_pattern(&self) -> String {
        format!("{}_*.{}", self.prefix, EXTENSION)
    }
}

/// Every calendar date in `from..=to`, empty when `from > to`
pub fn date_range(from: NaiveDate, to: NaiveDate) -> Vec<NaiveDate> {
    let mut dates = Vec::new();
    let mut current = from;

    while current <= to {
        dates.push(current);
        match current.succ_opt() {
            Some(next) => current = next,
            None => break,
        }
    }

    dates
}
