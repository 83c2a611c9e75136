//! Ingestion commands for hr-metrics

use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};

use crate::config::Config;
use crate::error::{HrError, Result};
use crate::ingest::BatchOutcome;
use crate::models::RawReading;
use crate::service::Service;
use crate::validate;

/// Store a single reading
pub async fn one(
    config: Config,
    device_id: String,
    user_id: String,
    timestamp: String,
    heart_rate: i64,
) -> Result<()> {
    let raw = RawReading {
        device_id: Some(device_id),
        user_id: Some(user_id),
        timestamp: Some(timestamp),
        heart_rate: Some(heart_rate),
    };
    validate::check_reading(&config, &raw)?;
    let reading = raw.into_reading()?;

    let service = Service::start(config)?;
    service.submit_reading(reading).await;
    service.shutdown().await?;

    println!("accepted");
    Ok(())
}

/// Store a JSON batch read from a file, or stdin when `source` is `-`
pub async fn batch(config: Config, source: String) -> Result<()> {
    let raw = if source == "-" {
        let mut buf = String::new();
        tokio::io::stdin().read_to_string(&mut buf).await?;
        buf
    } else {
        tokio::fs::read_to_string(&source).await?
    };

    let entries = batch_entries(serde_json::from_str(&raw)?)?;
    validate::check_batch_size(&config, entries.len())?;

    let (valid, pre_rejected) = screen(&config, entries);

    let service = Service::start(config)?;
    let mut outcome = service.submit_batch(valid).await;
    service.shutdown().await?;

    outcome.rejected += pre_rejected;
    print_outcome(&outcome);
    Ok(())
}

/// Ingest newline-delimited JSON readings from stdin until EOF or Ctrl-C
///
/// The periodic flush runs while the stream is open; the final flush runs on
/// exit either way.
pub async fn stream(config: Config) -> Result<()> {
    let service = Service::start(config)?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut outcome = BatchOutcome::default();

    let interrupted = tokio::signal::ctrl_c();
    tokio::pin!(interrupted);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        tracing::warn!(error = %e, "stdin read failed, stopping stream");
                        break;
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }
                match parse_line(service.config(), &line) {
                    Ok(raw) => {
                        let line_outcome = service.submit_batch(vec![raw]).await;
                        outcome.accepted += line_outcome.accepted;
                        outcome.rejected += line_outcome.rejected;
                    }
                    Err(e) => {
                        tracing::debug!(error = %e, "rejected stream line");
                        outcome.rejected += 1;
                    }
                }
            }
            _ = &mut interrupted => {
                tracing::info!("interrupted, flushing buffered readings");
                break;
            }
        }
    }

    service.shutdown().await?;
    print_outcome(&outcome);
    Ok(())
}

fn parse_line(config: &Config, line: &str) -> Result<RawReading> {
    let raw = RawReading::from_value(serde_json::from_str(line)?);
    validate::check_reading(config, &raw)?;
    Ok(raw)
}

/// Accept either a bare array or `{"readings": [...]}`
fn batch_entries(value: serde_json::Value) -> Result<Vec<serde_json::Value>> {
    match value {
        serde_json::Value::Array(items) => Ok(items),
        serde_json::Value::Object(mut map) => match map.remove("readings") {
            Some(serde_json::Value::Array(items)) => Ok(items),
            _ => Err(HrError::invalid_param("expected a `readings` array")),
        },
        _ => Err(HrError::invalid_param("expected a JSON array of readings")),
    }
}

/// Split entries into those passing request validation and a rejected count
fn screen(config: &Config, entries: Vec<serde_json::Value>) -> (Vec<RawReading>, usize) {
    let mut valid = Vec::with_capacity(entries.len());
    let mut rejected = 0;

    for entry in entries {
        let raw = RawReading::from_value(entry);
        match validate::check_reading(config, &raw) {
            Ok(()) => valid.push(raw),
            Err(e) => {
                tracing::debug!(error = %e, "rejected batch entry");
                rejected += 1;
            }
        }
    }

    (valid, rejected)
}

fn print_outcome(outcome: &BatchOutcome) {
    println!(
        "accepted: {}  rejected: {}  total: {}",
        outcome.accepted,
        outcome.rejected,
        outcome.total()
    );
}
