//! Error types for the Quarry library.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Quarry operations.
#[derive(Debug, Error)]
pub enum QuarryError {
    /// Error reading or writing a file.
    #[error("IO error for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration file could not be parsed.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A partition or manifest write failed.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// The input queue could not be read or acknowledged.
    #[error("Queue error: {0}")]
    Queue(String),

    /// A detection capability failed to classify its input.
    #[error("Detector error: {0}")]
    Detector(String),

    /// Another run already produced partitions under this identifier.
    #[error("Run '{run_ts}' already has partitions on disk; refusing to overwrite")]
    RunCollision { run_ts: String },

    /// Regex compilation error.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// Parquet encoding or decoding error.
    #[cfg(feature = "parquet")]
    #[error("Parquet error: {0}")]
    Parquet(String),
}

impl QuarryError {
    /// Wrap an IO error together with the path it concerns.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        QuarryError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for Quarry operations.
pub type Result<T> = std::result::Result<T, QuarryError>;
