//! Sparkify ETL - Star-Schema Loader
//!
//! A Rust library for loading song catalog records and user activity logs
//! into a small star-schema warehouse.
//!
//! # Features
//!
//! - Schema-driven normalization of raw JSON records
//! - Time dimension derivation from epoch milliseconds
//! - Idempotent dimension upserts (songs, artists, users, time)
//! - Attribute-based resolution of play events to song/artist keys
//! - One transaction per input file

/// Configuration management
pub mod config;
/// Warehouse connection ownership and statistics
pub mod db;
/// Error types
pub mod error;
/// Logging setup and utilities
pub mod logging;
/// Metrics collection
pub mod metrics;
/// Data models and structures
pub mod models;
/// Raw JSON record normalization
pub mod normalize;
/// Batch loading of source trees
pub mod pipeline;
/// Songplay fact resolution
pub mod resolver;
/// Database schema and source record layouts
pub mod schema;
/// Time dimension derivation
pub mod time_dim;
/// Warehouse writes and lookups
pub mod warehouse;

// Re-export key components for easier access
pub use db::Database;
pub use error::{EtlError, Result};
pub use models::{ActivityEvent, CatalogRecord, SongPlayFact, SourceKind, TimeRow, UserRow};
pub use pipeline::{process_data, LoadOptions, RunSummary};
pub use warehouse::{SqliteWarehouse, WarehouseSink};
