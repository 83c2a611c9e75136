//! Write buffering for incoming readings
//!
//! Readings are staged in one shared queue and written to their daily
//! partitions in batches, either when the queue reaches the configured size or
//! when the periodic flush task fires.
//!
//! A flush runs in its own task holding the buffer lock, so a caller that gives
//! up waiting never interrupts a half-finished flush. Groups that fail to write
//! go back into the buffer and are retried by the next flush.

mod flusher;

pub use flusher::FlushScheduler;

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tokio::sync::{Mutex as TokioMutex, OwnedMutexGuard};
use tokio::task::JoinSet;

use crate::error::{HrError, Result};
use crate::models::{RawReading, Reading};
use crate::storage::PartitionStore;

/// Accepted/rejected counts for one batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchOutcome {
    pub accepted: usize,
    pub rejected: usize,
}

impl BatchOutcome {
    pub fn total(&self) -> usize {
        self.accepted + self.rejected
    }
}

/// Shared staging queue in front of the partition store
pub struct WriteBuffer {
    pending: Arc<TokioMutex<VecDeque<Reading>>>,
    store: PartitionStore,
    batch_size: usize,
}

impl WriteBuffer {
    pub fn new(store: PartitionStore, batch_size: usize) -> Self {
        Self {
            pending: Arc::new(TokioMutex::new(VecDeque::new())),
            store,
            batch_size: batch_size.max(1),
        }
    }

    /// Buffer one reading, flushing first if the buffer is full
    ///
    /// A failed auto-flush keeps the readings buffered for the next attempt
    /// and is only logged; the reading itself has been accepted.
    pub async fn ingest_one(&self, reading: Reading) {
        let mut pending = self.pending.clone().lock_owned().await;
        pending.push_back(reading);

        if pending.len() >= self.batch_size {
            self.auto_flush(pending).await;
        }
    }

    /// Buffer a batch, counting structurally malformed entries as rejected
    pub async fn ingest_many<I>(&self, raw: I) -> BatchOutcome
    where
        I: IntoIterator<Item = RawReading>,
    {
        let mut outcome = BatchOutcome::default();
        let mut readings = Vec::new();

        for entry in raw {
            match entry.into_reading() {
                Ok(reading) => {
                    readings.push(reading);
                    outcome.accepted += 1;
                }
                Err(e) => {
                    tracing::debug!(error = %e, "rejected batch entry");
                    outcome.rejected += 1;
                }
            }
        }

        if !readings.is_empty() {
            let mut pending = self.pending.clone().lock_owned().await;
            pending.extend(readings);

            if pending.len() >= self.batch_size {
                self.auto_flush(pending).await;
            }
        }

        outcome
    }

    /// Write everything currently buffered, returning the number of rows written
    pub async fn flush(&self) -> Result<usize> {
        let pending = self.pending.clone().lock_owned().await;
        self.spawn_flush(pending).await
    }

    /// Number of readings waiting to be flushed
    pub async fn len(&self) -> usize {
        self.pending.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn auto_flush(&self, pending: OwnedMutexGuard<VecDeque<Reading>>) {
        let buffered = pending.len();
        match self.spawn_flush(pending).await {
            Ok(written) => tracing::debug!(written, "auto-flush complete"),
            Err(e) => tracing::warn!(buffered, error = %e, "auto-flush failed, readings kept for retry"),
        }
    }

    async fn spawn_flush(&self, pending: OwnedMutexGuard<VecDeque<Reading>>) -> Result<usize> {
        let store = self.store.clone();
        tokio::spawn(flush_pending(store, pending))
            .await
            .map_err(|e| HrError::storage(format!("Flush task failed: {}", e)))?
    }
}

/// Group the buffer by date and write every group concurrently
///
/// Holds the buffer lock for the whole flush. Groups whose write fails are put
/// back in the buffer in their original order.
async fn flush_pending(
    store: PartitionStore,
    mut pending: OwnedMutexGuard<VecDeque<Reading>>,
) -> Result<usize> {
    if pending.is_empty() {
        return Ok(0);
    }

    let mut groups: BTreeMap<NaiveDate, Vec<Reading>> = BTreeMap::new();
    for reading in pending.drain(..) {
        groups.entry(reading.date()).or_default().push(reading);
    }
    let groups: BTreeMap<NaiveDate, Arc<Vec<Reading>>> =
        groups.into_iter().map(|(date, rows)| (date, Arc::new(rows))).collect();

    let mut tasks = JoinSet::new();
    for (date, readings) in &groups {
        let store = store.clone();
        let date = *date;
        let readings = Arc::clone(readings);
        tasks.spawn(async move {
            let result = store.flush_group(date, readings.as_ref().clone()).await;
            (date, result)
        });
    }

    let mut written = 0;
    let mut failed: BTreeMap<NaiveDate, Arc<Vec<Reading>>> = groups.clone();
    let mut first_error = None;

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((date, Ok(()))) => {
                if let Some(rows) = failed.remove(&date) {
                    written += rows.len();
                }
            }
            Ok((date, Err(e))) => {
                tracing::warn!(%date, error = %e, "partition flush failed");
                first_error.get_or_insert(e);
            }
            Err(e) => {
                tracing::warn!(error = %e, "partition flush task failed");
                first_error.get_or_insert(HrError::storage(format!("Partition flush task failed: {}", e)));
            }
        }
    }

    for rows in failed.values() {
        pending.extend(rows.iter().cloned());
    }

    match first_error {
        Some(e) => Err(e),
        None => {
            tracing::debug!(written, partitions = groups.len(), "buffer flushed");
            Ok(written)
        }
    }
}
