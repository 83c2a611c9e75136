pub mod cli;
pub mod config;
pub mod error;
pub mod ingest;
pub mod models;
pub mod priority;
pub mod query;
pub mod service;
pub mod storage;
pub mod validate;

pub use error::{HrError, Result};
pub use service::Service;
