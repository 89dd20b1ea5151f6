//! Utility functions and helpers.

pub mod http;
pub mod url;

pub use url::{is_tidy, is_well_formed, resolve};
