//! Error types for ekitime.
//!
//! Library crates use [`EkitimeError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

use crate::types::LegendKind;

/// Top-level error type for all ekitime operations.
#[derive(Debug, thiserror::Error)]
pub enum EkitimeError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error while fetching a page.
    #[error("network error: {0}")]
    Network(String),

    /// An element the page format requires is missing.
    #[error("unexpected page structure: {message}")]
    Structure { message: String },

    /// A number or time on the page could not be interpreted.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// A train cell references a legend index the page scripts never defined.
    #[error("{kind} legend has no entry for index {index}")]
    LegendMismatch { kind: LegendKind, index: usize },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A background fetch task panicked or was cancelled.
    #[error("task error: {0}")]
    Task(String),

    /// CSV/JSON encoding error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Invalid input (bad URL, unsupported scheme, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, EkitimeError>;

impl EkitimeError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a structure error from any displayable message.
    pub fn structure(msg: impl Into<String>) -> Self {
        Self::Structure {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
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
