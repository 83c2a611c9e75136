//! Service lifecycle: one write buffer, one query engine, one flush task
//!
//! The service is created when the process starts and torn down with
//! [`Service::shutdown`], which stops the periodic flush and then always
//! flushes whatever is still buffered.

use std::sync::Arc;

use crate::config::Config;
use crate::error::Result;
use crate::ingest::{BatchOutcome, FlushScheduler, WriteBuffer};
use crate::models::{MinuteSample, RawReading, Reading};
use crate::priority::PriorityResolver;
use crate::query::{QueryEngine, QueryRequest};
use crate::storage::{self, PartitionStore};

pub struct Service {
    config: Config,
    store: PartitionStore,
    buffer: Arc<WriteBuffer>,
    query: QueryEngine,
    flusher: Option<FlushScheduler>,
}

impl Service {
    /// Open storage and start the periodic flush on the current runtime
    pub fn start(config: Config) -> Result<Self> {
        config.validate()?;

        let store = storage::open(&config)?;
        let buffer = Arc::new(WriteBuffer::new(store.clone(), config.batch_size));
        let priorities = Arc::new(PriorityResolver::new(config.device_priorities.clone()));
        let query = QueryEngine::new(store.clone(), priorities);
        let flusher = FlushScheduler::spawn(Arc::clone(&buffer), config.flush_interval());

        tracing::info!(
            data_dir = %config.data_dir.display(),
            batch_size = config.batch_size,
            flush_interval_secs = config.flush_interval_secs,
            "service started"
        );

        Ok(Self {
            config,
            store,
            buffer,
            query,
            flusher: Some(flusher),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &PartitionStore {
        &self.store
    }

    /// Shared handle to the write buffer for ingestion callers
    pub fn buffer(&self) -> Arc<WriteBuffer> {
        Arc::clone(&self.buffer)
    }

    pub async fn submit_reading(&self, reading: Reading) {
        self.buffer.ingest_one(reading).await;
    }

    pub async fn submit_batch(&self, readings: Vec<RawReading>) -> BatchOutcome {
        self.buffer.ingest_many(readings).await
    }

    pub async fn query(&self, request: &QueryRequest) -> Result<Vec<MinuteSample>> {
        self.query.query(request).await
    }

    /// Force a flush of everything buffered
    pub async fn flush(&self) -> Result<usize> {
        self.buffer.flush().await
    }

    /// Stop the flush task, then flush what is left
    ///
    /// The final flush runs even if stopping the task failed; its error takes
    /// precedence since it means buffered data did not reach disk.
    pub async fn shutdown(mut self) -> Result<()> {
        let stopped = match self.flusher.take() {
            Some(flusher) => flusher.stop().await,
            None => Ok(()),
        };

        let written = self.buffer.flush().await?;
        tracing::info!(written, "service stopped");
        stopped
    }
}

impl Drop for Service {
    fn drop(&mut self) {
        if self.flusher.is_some() {
            tracing::warn!("service dropped without shutdown, buffered readings may not be flushed");
        }
    }
}
