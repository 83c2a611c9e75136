//! Request validation done by the front end before readings reach the engine
//!
//! The engine itself only checks structure; bounds and batch limits live here.

use chrono::{DateTime, Utc};

use crate::config::Config;
use crate::error::{HrError, Result};
use crate::models::{parse_timestamp, RawReading};

/// Reject a reading with empty ids, a bad timestamp or an out-of-range heart rate
pub fn check_reading(config: &Config, raw: &RawReading) -> Result<()> {
    for (name, value) in [("device_id", &raw.device_id), ("user_id", &raw.user_id)] {
        match value.as_deref() {
            Some(v) if !v.trim().is_empty() => {}
            _ => return Err(HrError::invalid_reading(format!("`{}` must not be empty", name))),
        }
    }

    let timestamp = raw
        .timestamp
        .as_deref()
        .ok_or_else(|| HrError::invalid_reading("missing field `timestamp`"))?;
    parse_timestamp(timestamp)?;

    let heart_rate = raw
        .heart_rate
        .ok_or_else(|| HrError::invalid_reading("missing field `heart_rate`"))?;
    let (min, max) = (i64::from(config.min_heart_rate), i64::from(config.max_heart_rate));
    if !(min..=max).contains(&heart_rate) {
        return Err(HrError::invalid_reading(format!(
            "Heart rate must be between {} and {} bpm, got {}",
            min, max, heart_rate
        )));
    }

    Ok(())
}

/// Batch must hold between 1 and `max_batch_readings` entries
pub fn check_batch_size(config: &Config, len: usize) -> Result<()> {
    if len == 0 {
        return Err(HrError::invalid_param("Batch must contain at least one reading"));
    }
    if len > config.max_batch_readings {
        return Err(HrError::invalid_param(format!(
            "Batch size cannot exceed {} readings",
            config.max_batch_readings
        )));
    }
    Ok(())
}

/// Query range must be strictly increasing
pub fn check_range(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<()> {
    if start >= end {
        return Err(HrError::invalid_param("start must be before end"));
    }
    Ok(())
}
