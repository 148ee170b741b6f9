//! # cartpulse-core
//!
//! Core library for cartpulse - the event-ingestion and aggregation
//! pipeline of a commerce platform.
//!
//! This library provides:
//! - Domain types for tracked events and dashboard aggregates
//! - Append-only event storage with SQLite
//! - A relay toward the external conversion-tracking API
//! - The ingestion fan-out and the dashboard aggregation engine
//! - Configuration management and logging infrastructure
//!
//! ## Architecture
//!
//! One inbound event fans out to two independent writers:
//! - **Event store:** durable local record for internal analytics
//! - **Conversion relay:** best-effort, at-most-once forward to the
//!   external conversion API
//!
//! Neither leg gates the other, and neither failure ever reaches the
//! event sender. The aggregation engine is a pure reader: three
//! concurrent store reads reduced into one dashboard summary.
//!
//! ## Example
//!
//! ```rust,no_run
//! use cartpulse_core::{Config, Database};
//!
//! // Load configuration
//! let config = Config::load().expect("failed to load config");
//!
//! // Open the store
//! let db = Database::open(&Config::database_path()).expect("failed to open database");
//! db.migrate().expect("failed to run migrations");
//! ```

// Re-export commonly used items at the crate root
pub use analytics::{DashboardEngine, DashboardReads};
pub use config::Config;
pub use error::{AggregationError, Error, RelayError, Result, StoreError};
pub use ingest::{ConversionRelay, EventStore, IngestService};
pub use relay::ConversionClient;
pub use store::Database;
pub use types::*;

// Public modules
pub mod analytics;
pub mod config;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod relay;
pub mod store;
pub mod types;
