//! Error types for cartpulse-core
//!
//! Each pipeline component has its own error type so callers can react
//! per the propagation policy: store and relay failures are recovered
//! inside ingestion, aggregation failures surface as one opaque error.

use std::time::Duration;

use thiserror::Error;

/// Failure writing to or reading from the event store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error (connection loss, rejected write)
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error (creating the data directory, opening the file)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure dispatching an event to the external conversion API.
///
/// Never retried: delivery is at-most-once per ingestion attempt.
#[derive(Error, Debug)]
pub enum RelayError {
    /// Network-level failure before a response was received
    #[error("request failed: {0}")]
    Request(String),

    /// The outbound call exceeded its bounded timeout
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The API answered with a non-success status
    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },
}

/// Failure computing the dashboard summary.
///
/// Any of the three concurrent reads failing aborts the whole
/// computation; partial results are never returned.
#[derive(Error, Debug)]
pub enum AggregationError {
    /// One of the dashboard reads failed
    #[error("dashboard read failed: {0}")]
    Read(#[from] StoreError),
}

/// Main error type for the cartpulse-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Event store failure
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Conversion relay failure
    #[error(transparent)]
    Relay(#[from] RelayError),

    /// Dashboard aggregation failure
    #[error(transparent)]
    Aggregation(#[from] AggregationError),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for cartpulse-core
pub type Result<T> = std::result::Result<T, Error>;
