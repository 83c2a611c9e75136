//! Minute bucketing and device-priority resolution

use std::collections::BTreeMap;

use chrono::{DateTime, Timelike, Utc};

use crate::models::{MinuteSample, Reading};
use crate::priority::PriorityResolver;

/// Truncate an instant to the start of its minute
pub fn minute_bucket(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(ts)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug)]
struct DeviceTotals {
    rank: u32,
    sum: i64,
    count: u32,
}

/// Collapse filtered rows into one sample per minute
///
/// Within a minute only the device with the lowest rank contributes; equal
/// ranks go to the lexicographically smallest device id. Output is ascending
/// by minute.
pub fn aggregate<I>(rows: I, priorities: &PriorityResolver) -> Vec<MinuteSample>
where
    I: IntoIterator<Item = Reading>,
{
    let mut buckets: BTreeMap<DateTime<Utc>, BTreeMap<String, DeviceTotals>> = BTreeMap::new();

    for row in rows {
        let bucket = minute_bucket(row.instant());
        let rank = priorities.rank(&row.device_id);
        let totals = buckets
            .entry(bucket)
            .or_default()
            .entry(row.device_id)
            .or_insert(DeviceTotals { rank, sum: 0, count: 0 });
        totals.sum += i64::from(row.heart_rate);
        totals.count += 1;
    }

    buckets
        .into_iter()
        .filter_map(|(timestamp, devices)| {
            let (device_id, totals) = devices
                .into_iter()
                .min_by(|(a_id, a), (b_id, b)| a.rank.cmp(&b.rank).then_with(|| a_id.cmp(b_id)))?;
            Some(MinuteSample {
                timestamp,
                heart_rate: round2(totals.sum as f64 / f64::from(totals.count)),
                device_id,
            })
        })
        .collect()
}
