//! Parquet read/write utilities for date-partitioned storage
//!
//! Uses Arrow record batches for columnar storage.
//! Supports concurrent writes to different partitions via partition-level locks.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, Int32Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;
use dashmap::DashMap;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use tokio::sync::Mutex as TokioMutex;

use crate::error::{HrError, Result};
use crate::models::Reading;

use super::partitions::{date_range, PartitionNaming};

fn reading_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("device_id", DataType::Utf8, false),
        Field::new("user_id", DataType::Utf8, false),
        Field::new("timestamp", DataType::Utf8, false),
        Field::new("heart_rate", DataType::Int32, false),
        Field::new("date", DataType::Utf8, false),
    ]))
}

/// Parquet storage for heart-rate readings, one file per calendar date
///
/// Each partition has its own lock so that two flushes of the same date never
/// race their read-modify-write cycles, while different dates proceed in
/// parallel. Clones share the lock table; open one store per data directory.
#[derive(Clone)]
pub struct PartitionStore {
    base_path: PathBuf,
    naming: PartitionNaming,
    /// Per-partition locks for concurrent write safety
    partition_locks: Arc<DashMap<NaiveDate, Arc<TokioMutex<()>>>>,
}

impl PartitionStore {
    /// Create a new PartitionStore at the given base path
    pub fn new(base_path: impl Into<PathBuf>, file_prefix: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
            naming: PartitionNaming::new(file_prefix),
            partition_locks: Arc::new(DashMap::new()),
        }
    }

    /// Get or create a lock for a specific partition
    fn get_partition_lock(&self, date: NaiveDate) -> Arc<TokioMutex<()>> {
        self.partition_locks
            .entry(date)
            .or_insert_with(|| Arc::new(TokioMutex::new(())))
            .clone()
    }

    /// Get the full path for a partition file
    pub fn partition_path(&self, date: NaiveDate) -> PathBuf {
        self.base_path.join(self.naming.file_name(date))
    }

    /// Ensure the data directory exists
    pub fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.base_path).map_err(|e| {
            HrError::storage(format!(
                "Failed to create directory {:?}: {}",
                self.base_path, e
            ))
        })
    }

    /// Append readings to the partition for `date`
    ///
    /// The partition is read, concatenated with `readings` and rewritten as a
    /// whole under the partition lock. The new file only becomes visible once
    /// it is complete; on failure the previous version is left untouched.
    pub async fn flush_group(&self, date: NaiveDate, readings: Vec<Reading>) -> Result<()> {
        if readings.is_empty() {
            return Ok(());
        }
        self.ensure_dir()?;

        // Acquire partition lock
        let lock = self.get_partition_lock(date);
        let _guard = lock.lock().await;

        let path = self.partition_path(date);
        let count = readings.len();
        tokio::task::spawn_blocking(move || Self::merge_into(&path, date, readings))
            .await
            .map_err(|e| HrError::storage(format!("Partition write task failed: {}", e)))??;

        tracing::debug!(%date, rows = count, "flushed partition group");
        Ok(())
    }

    fn merge_into(path: &Path, date: NaiveDate, readings: Vec<Reading>) -> Result<()> {
        let mut combined = Self::read_readings_from_path(path)?;
        combined.extend(readings);

        let batch = Self::readings_to_batch(date, &combined)?;
        Self::write_batch(path, &batch)
    }

    /// Read every reading stored for `date`, empty if the partition does not exist
    pub fn read_partition(&self, date: NaiveDate) -> Result<Vec<Reading>> {
        Self::read_readings_from_path(&self.partition_path(date))
    }

    /// Dates in `from..=to` whose partition file exists
    pub fn list_partitions(&self, from: NaiveDate, to: NaiveDate) -> Vec<NaiveDate> {
        date_range(from, to)
            .into_iter()
            .filter(|date| self.partition_path(*date).exists())
            .collect()
    }

    /// Every partition in the data directory, ascending
    pub fn all_partitions(&self) -> Result<Vec<NaiveDate>> {
        if !self.base_path.exists() {
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&self.base_path).map_err(|e| {
            HrError::storage(format!("Failed to list {:?}: {}", self.base_path, e))
        })?;

        let mut dates = Vec::new();
        for entry in entries {
            let entry = entry?;
            if let Some(date) = entry
                .file_name()
                .to_str()
                .and_then(|name| self.naming.parse_file_name(name))
            {
                dates.push(date);
            }
        }
        dates.sort();
        Ok(dates)
    }

    /// Write a record batch to a partition file atomically
    fn write_batch(path: &Path, batch: &RecordBatch) -> Result<()> {
        // Write to temp file first
        let temp_path = path.with_extension("parquet.tmp");

        let result = Self::write_temp(&temp_path, batch).and_then(|_| {
            // Atomic rename
            fs::rename(&temp_path, path)
                .map_err(|e| HrError::storage(format!("Failed to rename temp file: {}", e)))
        });

        if result.is_err() {
            let _ = fs::remove_file(&temp_path);
        }
        result
    }

    fn write_temp(temp_path: &Path, batch: &RecordBatch) -> Result<()> {
        let file = File::create(temp_path)
            .map_err(|e| HrError::storage(format!("Failed to create temp file: {}", e)))?;

        let props = WriterProperties::builder()
            .set_compression(Compression::ZSTD(Default::default()))
            .build();

        let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))
            .map_err(|e| HrError::storage(format!("Failed to create Parquet writer: {}", e)))?;

        writer
            .write(batch)
            .map_err(|e| HrError::storage(format!("Failed to write batch: {}", e)))?;

        let file = writer
            .into_inner()
            .map_err(|e| HrError::storage(format!("Failed to close writer: {}", e)))?;

        file.sync_all()
            .map_err(|e| HrError::storage(format!("Failed to sync temp file: {}", e)))
    }

    /// Read all record batches from a partition file
    fn read_batches(path: &Path) -> Result<Vec<RecordBatch>> {
        if !path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(path)
            .map_err(|e| HrError::storage(format!("Failed to open file: {}", e)))?;

        let reader = ParquetRecordBatchReaderBuilder::try_new(file)
            .map_err(|e| HrError::storage(format!("Failed to create reader: {}", e)))?
            .build()
            .map_err(|e| HrError::storage(format!("Failed to build reader: {}", e)))?;

        reader
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| HrError::storage(format!("Failed to read batches: {}", e)))
    }

    fn read_readings_from_path(path: &Path) -> Result<Vec<Reading>> {
        let batches = Self::read_batches(path)?;
        let mut readings = Vec::new();

        for batch in batches {
            readings.extend(Self::batch_to_readings(&batch)?);
        }

        Ok(readings)
    }

    fn readings_to_batch(date: NaiveDate, readings: &[Reading]) -> Result<RecordBatch> {
        let partition_key = PartitionNaming::partition_key(date);

        let device_id: StringArray = readings.iter().map(|r| Some(r.device_id.as_str())).collect();
        let user_id: StringArray = readings.iter().map(|r| Some(r.user_id.as_str())).collect();
        let timestamp: StringArray = readings.iter().map(|r| Some(r.timestamp.as_str())).collect();
        let heart_rate: Int32Array = readings.iter().map(|r| Some(r.heart_rate)).collect();
        let date: StringArray = readings.iter().map(|_| Some(partition_key.as_str())).collect();

        let columns: Vec<ArrayRef> = vec![
            Arc::new(device_id),
            Arc::new(user_id),
            Arc::new(timestamp),
            Arc::new(heart_rate),
            Arc::new(date),
        ];

        RecordBatch::try_new(reading_schema(), columns)
            .map_err(|e| HrError::storage(format!("Failed to create record batch: {}", e)))
    }

    fn batch_to_readings(batch: &RecordBatch) -> Result<Vec<Reading>> {
        let len = batch.num_rows();
        let mut readings = Vec::with_capacity(len);

        let device_id = string_column(batch, "device_id")?;
        let user_id = string_column(batch, "user_id")?;
        let timestamp = string_column(batch, "timestamp")?;
        let heart_rate = batch
            .column_by_name("heart_rate")
            .and_then(|c| c.as_any().downcast_ref::<Int32Array>())
            .ok_or_else(|| HrError::storage("Partition is missing Int32 column `heart_rate`"))?;

        for i in 0..len {
            if device_id.is_null(i) || user_id.is_null(i) || timestamp.is_null(i) || heart_rate.is_null(i) {
                return Err(HrError::storage(format!("Partition row {} has null fields", i)));
            }
            let reading = Reading::new(
                device_id.value(i),
                user_id.value(i),
                timestamp.value(i),
                heart_rate.value(i),
            )
            .map_err(|e| HrError::storage(format!("Partition row {} is corrupt: {}", i, e)))?;
            readings.push(reading);
        }

        Ok(readings)
    }

    /// Get the base path for external readers
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Glob pattern (relative to the base path) matching every partition
    pub fn glob_pattern(&self) -> String {
        self.naming.glob_pattern()
    }
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| HrError::storage(format!("Partition is missing Utf8 column `{}`", name)))
}
