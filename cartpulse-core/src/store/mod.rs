//! Event store for cartpulse
//!
//! SQLite-backed storage with:
//! - Schema migrations
//! - Append-only analytics event writes
//! - Read surface for the aggregation engine (orders, customers,
//!   activity log)

pub mod repo;
pub mod schema;

pub use repo::Database;
