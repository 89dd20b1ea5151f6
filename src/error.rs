// src/error.rs

//! Unified error handling for the harvester.

use std::fmt;

use thiserror::Error;

/// Result type alias for harvester operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A link or record was rejected before reaching the store
    #[error("Validation error: {0}")]
    Validation(String),

    /// A page or post could not be retrieved or extracted
    #[error("Fetch error for {context}: {message}")]
    Fetch { context: String, message: String },

    /// Writing a record or appending to the index failed
    #[error("Persistence error for {context}: {message}")]
    Persistence { context: String, message: String },

    /// Rewriting the source metadata failed
    #[error("Meta write error for {source_name}: {message}")]
    MetaWrite {
        source_name: String,
        message: String,
    },

    /// Store used outside of its load-then-save lifecycle
    #[error("Store state error: {0}")]
    State(String),
}

impl AppError {
    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a fetch error with context.
    pub fn fetch(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Fetch {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Create a persistence error with context.
    pub fn persistence(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Persistence {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Create a meta write error.
    pub fn meta_write(source: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::MetaWrite {
            source_name: source.into(),
            message: message.to_string(),
        }
    }

    /// Create a store lifecycle error.
    pub fn state(message: impl Into<String>) -> Self {
        Self::State(message.into())
    }
}
