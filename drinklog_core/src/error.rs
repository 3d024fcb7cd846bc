//! Error types for the drinklog_core library.
//!
//! The estimation engine itself is infallible; these errors come from the
//! file-backed collaborators (log, CSV transfer, configuration).

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for drinklog_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Drink log error
    #[error("Drink log error: {0}")]
    Log(String),

    /// CSV import error
    #[error("Import error: {0}")]
    Import(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}
