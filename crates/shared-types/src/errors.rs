//! # Error Types
//!
//! Errors raised by value construction and by the storage port.

use thiserror::Error;

/// Rejected input while building a domain value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeError {
    /// Color is not a `#RRGGBB` hex string.
    #[error("Invalid color '{0}': expected #RRGGBB")]
    InvalidColor(String),

    /// Identity was empty after trimming.
    #[error("Identity must not be empty")]
    EmptyIdentity,

    /// Transaction id was empty after normalization.
    #[error("Transaction id must not be empty")]
    EmptyTransactionId,

    /// Write id was empty.
    #[error("Write id must not be empty")]
    EmptyWriteId,
}

/// Key-value store errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KVStoreError {
    /// I/O error during read/write.
    #[error("KV store I/O error: {message}")]
    IOError { message: String },

    /// Data corruption in the store.
    #[error("KV store corruption: {message}")]
    CorruptionError { message: String },

    /// Key not found.
    #[error("Key not found in KV store")]
    NotFound,
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Invalid size or count limit
    #[error("invalid limit: {0}")]
    InvalidLimit(String),
    /// Invalid interval or timeout value
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
    /// A required setting is absent
    #[error("missing setting: {0}")]
    Missing(String),
    /// General configuration error
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
