//! Error types for the credit ledger and admission gate

use shared_types::{Identity, KVStoreError, WriteId};
use thiserror::Error;

/// Credit ledger errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// Debit or credit of zero units
    #[error("Unit count must be at least 1")]
    InvalidUnits,

    /// Credit would overflow the balance
    #[error("Balance overflow for {identity}")]
    BalanceOverflow { identity: Identity },

    /// Persisting the ledger change failed; nothing was applied
    #[error("Storage error: {reason}")]
    Storage { reason: String },

    /// A stored ledger record could not be decoded
    #[error("Corrupted ledger record at {key}: {reason}")]
    Corrupted { key: String, reason: String },
}

impl From<KVStoreError> for LedgerError {
    fn from(err: KVStoreError) -> Self {
        LedgerError::Storage {
            reason: err.to_string(),
        }
    }
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Admission gate errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdmissionError {
    /// Coordinate outside the grid. Nothing debited.
    #[error("Coordinate ({x}, {y}) is outside the {width}x{height} canvas")]
    OutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },

    /// Not enough credit for the write. Nothing committed.
    #[error("Insufficient credit for {identity}: balance {balance}")]
    InsufficientCredit { identity: Identity, balance: u64 },

    /// Another request with the same write id is being processed
    #[error("Write {write_id} is already in progress")]
    WriteInProgress { write_id: WriteId },

    /// Ledger failure
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// The store refused the commit. The debit was refunded.
    #[error("Commit failed: {reason}")]
    CommitFailed { reason: String },
}

/// Result type for admission operations
pub type AdmissionResult<T> = Result<T, AdmissionError>;
