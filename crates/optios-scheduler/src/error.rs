//! Error types for the scheduler.

use thiserror::Error;

/// Scheduler errors.
#[derive(Error, Debug)]
pub enum SchedulerError {
    /// Metrics sampler failed to produce a reading.
    #[error("sampling error: {0}")]
    Sampling(String),

    /// Telemetry record with a negative or non-finite field.
    #[error("invalid telemetry: {0}")]
    InvalidTelemetry(String),

    /// Persistence sink rejected a record.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Decision log write failed.
    #[error("decision log error: {0}")]
    DecisionLog(String),

    /// Scheduling requested for a batch without processes.
    #[error("process batch is empty")]
    EmptyBatch,

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<sqlx::Error> for SchedulerError {
    fn from(err: sqlx::Error) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Result type for scheduler operations.
pub type Result<T> = std::result::Result<T, SchedulerError>;
