//! Error types for the canvas store

use shared_types::KVStoreError;
use thiserror::Error;

/// Canvas store errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CanvasError {
    /// Coordinate outside the grid. No state change.
    #[error("Coordinate ({x}, {y}) is outside the {width}x{height} canvas")]
    OutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },

    /// Persisting the cell failed. The slot was left untouched.
    #[error("Storage error: {reason}")]
    Storage { reason: String },

    /// A stored record could not be decoded.
    #[error("Corrupted record at {key}: {reason}")]
    Corrupted { key: String, reason: String },
}

impl From<KVStoreError> for CanvasError {
    fn from(err: KVStoreError) -> Self {
        CanvasError::Storage {
            reason: err.to_string(),
        }
    }
}

/// Result type for canvas operations
pub type CanvasResult<T> = Result<T, CanvasError>;
