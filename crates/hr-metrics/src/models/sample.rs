//! Aggregated query output

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

/// Output format for minute bucket timestamps
pub const MINUTE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

fn serialize_minute<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&ts.format(MINUTE_FORMAT).to_string())
}

/// One aggregated value per minute bucket
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MinuteSample {
    /// Start of the minute, seconds and sub-seconds zeroed
    #[serde(serialize_with = "serialize_minute")]
    pub timestamp: DateTime<Utc>,
    /// Mean of the winning device's readings, rounded to 2 decimals
    pub heart_rate: f64,
    /// Device that won the bucket
    pub device_id: String,
}

impl MinuteSample {
    pub fn timestamp_str(&self) -> String {
        self.timestamp.format(MINUTE_FORMAT).to_string()
    }
}
