//! Error types for DocAssembler.
//!
//! Library crates use [`DocAssemblerError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all DocAssembler operations.
#[derive(Debug, thiserror::Error)]
pub enum DocAssemblerError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A file the pipeline expected to exist is gone.
    #[error("file not found: {path}")]
    FileNotFound { path: String },

    /// A user-supplied replacement expression failed to compile.
    #[error("invalid pattern '{pattern}': {message}")]
    Pattern { pattern: String, message: String },

    /// Manifest or text consistency error (bad span, collision, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Markdown or configuration parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DocAssemblerError>;

impl DocAssemblerError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
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

    /// Create a not-found error for a catalog path.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error is an I/O failure the pipeline downgrades to a stage error.
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io { .. })
    }
}
