//! Heart-rate readings as submitted by devices

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{HrError, Result};

/// Parse an ISO 8601 timestamp that carries an explicit UTC offset
///
/// Accepts both the `Z` suffix and numeric offsets (`+02:00`, `+0200`),
/// with or without fractional seconds.
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .or_else(|_| DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f%z"))
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| HrError::InvalidTimestamp(s.to_string()))
}

/// A single validated heart-rate reading
///
/// The timestamp is kept exactly as received; the parsed instant and the
/// partition date are derived from it once at construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reading {
    pub device_id: String,
    pub user_id: String,
    pub timestamp: String,
    pub heart_rate: i32,
    #[serde(skip)]
    instant: DateTime<Utc>,
}

impl Reading {
    pub fn new(
        device_id: impl Into<String>,
        user_id: impl Into<String>,
        timestamp: impl Into<String>,
        heart_rate: i32,
    ) -> Result<Self> {
        let timestamp = timestamp.into();
        let instant = parse_timestamp(&timestamp)?;
        Ok(Self {
            device_id: device_id.into(),
            user_id: user_id.into(),
            timestamp,
            heart_rate,
            instant,
        })
    }

    /// The reading's point in time, normalized to UTC
    pub fn instant(&self) -> DateTime<Utc> {
        self.instant
    }

    /// Calendar date (UTC) used to route the reading to its partition
    pub fn date(&self) -> NaiveDate {
        self.instant.date_naive()
    }
}

/// An unchecked reading, as it arrives inside a batch
///
/// Every field is optional so that one malformed entry can be counted as
/// rejected instead of failing the whole batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawReading {
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub heart_rate: Option<i64>,
}

impl RawReading {
    /// Decode one batch entry, mapping type mismatches to an empty (rejected) entry
    pub fn from_value(value: serde_json::Value) -> Self {
        serde_json::from_value(value).unwrap_or_default()
    }

    /// Structural check: all fields present and the timestamp parses
    pub fn into_reading(self) -> Result<Reading> {
        let device_id = self
            .device_id
            .ok_or_else(|| HrError::invalid_reading("missing field `device_id`"))?;
        let user_id = self
            .user_id
            .ok_or_else(|| HrError::invalid_reading("missing field `user_id`"))?;
        let timestamp = self
            .timestamp
            .ok_or_else(|| HrError::invalid_reading("missing field `timestamp`"))?;
        let heart_rate = self
            .heart_rate
            .ok_or_else(|| HrError::invalid_reading("missing field `heart_rate`"))?;
        let heart_rate = i32::try_from(heart_rate)
            .map_err(|_| HrError::invalid_reading(format!("heart_rate {} out of range", heart_rate)))?;

        Reading::new(device_id, user_id, timestamp, heart_rate)
    }
}
