//! Domain-level error types.

use std::time::Duration;

use thiserror::Error;

use crate::ports::StoreError;

/// Failures surfaced by the write operations of the rate window.
///
/// Read-side problems never appear here: a missing, corrupt or unreadable
/// window is replaced by a fresh one.
#[derive(Debug, Error)]
pub enum QuotaError {
    #[error("Storage failure: {0}")]
    Storage(#[from] StoreError),

    #[error("Serialization failed: {0}")]
    Serialization(String),
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Window period must be greater than zero")]
    ZeroPeriod,

    #[error("Window period is out of range: {0:?}")]
    PeriodOutOfRange(Duration),

    #[error("Invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}
