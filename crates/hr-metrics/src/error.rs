use thiserror::Error;

/// Main error type for hr-metrics
#[derive(Error, Debug)]
pub enum HrError {
    #[error("Invalid reading: {0}")]
    InvalidReading(String),

    #[error("Invalid timestamp: {0}. Expected ISO 8601 with a UTC offset")]
    InvalidTimestamp(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config file error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, HrError>;

impl HrError {
    /// Create an invalid reading error from a message
    pub fn invalid_reading(msg: impl Into<String>) -> Self {
        Self::InvalidReading(msg.into())
    }

    /// Create a storage error from a message
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a configuration error from a message
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid parameter error from a message
    pub fn invalid_param(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }
}
