//! Error types for terrace.
//!
//! This module defines all error types used throughout the library.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using [`DenoiseError`].
pub type Result<T> = std::result::Result<T, DenoiseError>;

/// Errors that can occur while building, denoising or storing height fields.
#[derive(Error, Debug)]
pub enum DenoiseError {
    /// Invalid parameter value.
    #[error("invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// The invalid value (as string).
        value: String,
        /// Reason the value is invalid.
        reason: &'static str,
    },

    /// The target grid does not have the dimensions of the source grid.
    #[error("grid dimensions differ: expected {expected_nx}x{expected_ny}, got {nx}x{ny}")]
    DimensionMismatch {
        /// Columns of the source grid.
        expected_nx: usize,
        /// Rows of the source grid.
        expected_ny: usize,
        /// Columns of the target grid.
        nx: usize,
        /// Rows of the target grid.
        ny: usize,
    },

    /// A grid could not be constructed from the given data.
    #[error("invalid grid: {0}")]
    InvalidGrid(String),

    /// The operation was cancelled through its progress handle.
    #[error("cancelled during {phase} (round {round})")]
    Cancelled {
        /// Name of the phase that observed the cancellation.
        phase: &'static str,
        /// The round that was about to start.
        round: usize,
    },

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error loading a grid from file.
    #[error("failed to load grid from {path}: {message}")]
    LoadError {
        /// The file path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Error saving a grid or mesh to file.
    #[error("failed to save to {path}: {message}")]
    SaveError {
        /// The file path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Unsupported file format.
    #[error("unsupported file format: {extension}")]
    UnsupportedFormat {
        /// The file extension.
        extension: String,
    },
}

impl DenoiseError {
    /// Create an invalid parameter error.
    pub fn invalid_param<T: std::fmt::Display>(
        name: &'static str,
        value: T,
        reason: &'static str,
    ) -> Self {
        DenoiseError::InvalidParameter {
            name,
            value: value.to_string(),
            reason,
        }
    }

    /// Create a load error for `path`.
    pub(crate) fn load(path: &std::path::Path, message: impl Into<String>) -> Self {
        DenoiseError::LoadError {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }
}
