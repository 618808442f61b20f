//! Error types for docpipe.
//!
//! Library crates use [`DocpipeError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all docpipe operations.
#[derive(Debug, thiserror::Error)]
pub enum DocpipeError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Markup could not be read into a document tree.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Caller input failed validation (bad identifier, out-of-range offsets, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// The external text-extraction process failed. Never retried.
    #[error("extraction failed: {0}")]
    Extraction(String),

    /// A pipeline stage could not find the input it reads.
    #[error("pipeline error in stage {stage}: {message}")]
    Pipeline { stage: String, message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DocpipeError>;

impl DocpipeError {
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

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Report a stage whose input is missing from the pipeline context.
    pub fn pipeline(stage: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Pipeline {
            stage: stage.into(),
            message: msg.into(),
        }
    }
}
