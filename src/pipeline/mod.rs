//! Pipeline entry points for harvesting.
//!
//! - `run_harvest`: Harvest every source concurrently and collect reports
//! - `harvest_source`: The sequential loop for a single source

pub mod harvest;

pub use harvest::{build_adapters, harvest_source, run_harvest, shutdown_signal};
