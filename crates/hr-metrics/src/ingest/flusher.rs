//! Periodic background flush of the write buffer

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::error::{HrError, Result};

use super::WriteBuffer;

/// Handle to the background flush task
pub struct FlushScheduler {
    handle: Option<JoinHandle<()>>,
    cancel_token: CancellationToken,
}

impl FlushScheduler {
    /// Spawn the flush loop on the current runtime
    pub fn spawn(buffer: Arc<WriteBuffer>, every: Duration) -> Self {
        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(flush_loop(buffer, every, cancel_token.clone()));

        Self {
            handle: Some(handle),
            cancel_token,
        }
    }

    /// Ask the loop to stop; a flush already in progress runs to completion
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    /// Cancel the loop and wait for it to exit
    pub async fn stop(mut self) -> Result<()> {
        self.cancel();

        if let Some(handle) = self.handle.take() {
            handle
                .await
                .map_err(|e| HrError::storage(format!("Flush loop failed to join: {}", e)))?;
        }
        Ok(())
    }
}

impl Drop for FlushScheduler {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

async fn flush_loop(buffer: Arc<WriteBuffer>, every: Duration, cancel_token: CancellationToken) {
    let mut ticker = tokio::time::interval_at(Instant::now() + every, every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match buffer.flush().await {
                    Ok(0) => {}
                    Ok(written) => tracing::debug!(written, "periodic flush complete"),
                    Err(e) => tracing::warn!(error = %e, "periodic flush failed, will retry"),
                }
            }
            _ = cancel_token.cancelled() => {
                tracing::debug!("flush loop shutting down");
                break;
            }
        }
    }
}
