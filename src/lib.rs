// src/lib.rs

//! insight-hub: harvests blog posts from many sources and stores each post
//! exactly once.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod store;
pub mod utils;
