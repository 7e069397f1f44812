//! Error types for the checkpoint engine.
//!
//! Only allocation pressure is recovered from (by the planner's halving
//! loop). Every variant that reaches a caller is fatal to the run.

use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;

/// Errors that can occur while saving or replaying forward frames.
#[derive(Debug, Error)]
pub enum CollectorError {
    /// The resident buffer cannot be sized even at the minimum capacity.
    #[error(
        "Cannot allocate resident buffer: requested {requested} frames of {frame_bytes} bytes, \
         nothing succeeded down to {min_frames} frames"
    )]
    AllocationFailure {
        /// Frame count of the first request
        requested: usize,
        /// Bytes per frame
        frame_bytes: usize,
        /// Smallest capacity that was still viable
        min_frames: usize,
    },

    /// A chunk or frame blob could not be written or read.
    #[error("Storage I/O failure on {}: {source}", path.display())]
    StorageIoFailure {
        /// File being accessed
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Encoding or decoding of a frame failed.
    #[error("Compression failure for frame {frame}: {message}")]
    CompressionFailure {
        /// Global frame ordinal
        frame: usize,
        /// Description of the issue
        message: String,
    },

    /// A save/fetch call arrived out of order, out of count or in the wrong state.
    #[error("Contract violation: {message}")]
    ContractViolation {
        /// Description of the issue
        message: String,
    },

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl CollectorError {
    /// Creates a contract violation error.
    pub fn contract(message: impl Into<String>) -> Self {
        Self::ContractViolation {
            message: message.into(),
        }
    }

    /// Creates a compression failure for `frame`.
    pub fn compression(frame: usize, message: impl Into<String>) -> Self {
        Self::CompressionFailure {
            frame,
            message: message.into(),
        }
    }

    /// Creates a storage failure for `path`.
    pub fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::StorageIoFailure {
            path: path.into(),
            source,
        }
    }
}

/// Result type for checkpoint operations.
pub type CollectorResult<T> = Result<T, CollectorError>;
