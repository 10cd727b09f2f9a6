//! Error types for SchoolScrape.
//!
//! Library crates use [`ScrapeError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! Everything in this enum is fatal for a run. Per-target page failures are
//! modelled separately (see `schoolscrape_crawler::PageError`) and never
//! reach this type unless the page session itself is gone.

use std::path::PathBuf;

/// Top-level error type for all SchoolScrape operations.
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// The page session (HTTP client or browser) could not be created or died.
    #[error("page session error: {0}")]
    Session(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Dataset serialization error (CSV or JSON encoding/decoding).
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Data validation error (malformed prior dataset, bad seed entry, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ScrapeError>;

impl ScrapeError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
