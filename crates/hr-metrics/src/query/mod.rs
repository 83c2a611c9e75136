//! Range queries over the partition store
//!
//! A query loads the daily partitions overlapping the requested range, keeps
//! the rows for one user (and optionally one device) inside the range, and
//! reduces them to one [`MinuteSample`] per minute.

mod aggregate;

pub use aggregate::{aggregate, minute_bucket};

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::{HrError, Result};
use crate::models::{parse_timestamp, MinuteSample, Reading};
use crate::priority::PriorityResolver;
use crate::storage::PartitionStore;

/// Parameters of a range query; `start` and `end` are inclusive
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    pub user_id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub device_id: Option<String>,
}

impl QueryRequest {
    pub fn new(
        user_id: impl Into<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        device_id: Option<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            start,
            end,
            device_id,
        }
    }

    /// Build a request from ISO 8601 strings
    pub fn parse(
        user_id: impl Into<String>,
        start: &str,
        end: &str,
        device_id: Option<String>,
    ) -> Result<Self> {
        Ok(Self::new(user_id, parse_timestamp(start)?, parse_timestamp(end)?, device_id))
    }

    fn matches(&self, reading: &Reading) -> bool {
        reading.user_id == self.user_id
            && self
                .device_id
                .as_deref()
                .map_or(true, |device| reading.device_id == device)
            && reading.instant() >= self.start
            && reading.instant() <= self.end
    }
}

/// Read-only query path over the partition store
#[derive(Clone)]
pub struct QueryEngine {
    store: PartitionStore,
    priorities: Arc<PriorityResolver>,
}

impl QueryEngine {
    pub fn new(store: PartitionStore, priorities: Arc<PriorityResolver>) -> Self {
        Self { store, priorities }
    }

    /// Per-minute series for one user, ascending by minute
    ///
    /// Returns an empty series both when no partition overlaps the range and
    /// when partitions exist but no row matches.
    pub async fn query(&self, request: &QueryRequest) -> Result<Vec<MinuteSample>> {
        if request.start > request.end {
            return Ok(Vec::new());
        }

        let dates = self
            .store
            .list_partitions(request.start.date_naive(), request.end.date_naive());
        if dates.is_empty() {
            tracing::debug!(user_id = %request.user_id, "no partitions in range");
            return Ok(Vec::new());
        }

        let store = self.store.clone();
        let rows = tokio::task::spawn_blocking(move || {
            let mut rows = Vec::new();
            for date in dates {
                rows.extend(store.read_partition(date)?);
            }
            Ok::<_, HrError>(rows)
        })
        .await
        .map_err(|e| HrError::storage(format!("Partition read task failed: {}", e)))??;

        let scanned = rows.len();
        let matching = rows.into_iter().filter(|row| request.matches(row));
        let samples = aggregate(matching, &self.priorities);

        tracing::debug!(
            user_id = %request.user_id,
            scanned,
            buckets = samples.len(),
            "query complete"
        );
        Ok(samples)
    }
}
