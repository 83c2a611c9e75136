//! Data models shared by the ingest, storage and query layers

mod reading;
mod sample;

pub use reading::{parse_timestamp, RawReading, Reading};
pub use sample::{MinuteSample, MINUTE_FORMAT};
