// src/models/mod.rs

//! Domain models for the harvester.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod record;
mod report;
mod source;

// Re-export all public types
pub use config::{Config, CrawlerConfig, LoggingConfig, StorageConfig};
pub use record::{Meta, Record, RecordId};
pub use report::{HarvestSummary, SourceReport};
pub use source::{DateSelector, FieldSelector, SourceConfig};
