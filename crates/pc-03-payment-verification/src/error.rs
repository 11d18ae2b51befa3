//! Error types for payment verification

use shared_types::{KVStoreError, PaymentState, TransactionId};
use thiserror::Error;

/// Finality oracle errors. Every variant is retried until the payment's
/// verification window closes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OracleError {
    /// Transport failure or non-success status
    #[error("Oracle unavailable: {reason}")]
    Unavailable { reason: String },

    /// The oracle answered with something we could not interpret
    #[error("Oracle returned an invalid response: {reason}")]
    InvalidResponse { reason: String },
}

/// Failure of the credit sink behind a confirmed payment.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Credit could not be applied: {reason}")]
pub struct CreditSinkError {
    pub reason: String,
}

/// Payment verification errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    /// The paid amount buys no write units
    #[error("Amount {amount_sompi} sompi is below the pack cost of {pack_cost_sompi} sompi")]
    AmountTooSmall {
        amount_sompi: u64,
        pack_cost_sompi: u64,
    },

    /// Purchases need a receiver address
    #[error("No receiver address is configured")]
    ReceiverNotConfigured,

    /// No payment with this id was ever submitted
    #[error("Unknown transaction {0}")]
    UnknownTransaction(TransactionId),

    /// Manual reconciliation only applies to payments that stopped without credit
    #[error("Transaction {transaction_id} is {state} and cannot be reconciled")]
    NotReconcilable {
        transaction_id: TransactionId,
        state: PaymentState,
    },

    /// The one-off oracle query of a reconciliation failed
    #[error(transparent)]
    Oracle(#[from] OracleError),

    /// The confirmed payment could not be credited
    #[error(transparent)]
    Credit(#[from] CreditSinkError),

    /// Reading or writing payment records failed
    #[error("Storage error: {reason}")]
    Storage { reason: String },

    /// A stored payment record could not be decoded
    #[error("Corrupted payment record at {key}: {reason}")]
    Corrupted { key: String, reason: String },
}

impl From<KVStoreError> for VerificationError {
    fn from(err: KVStoreError) -> Self {
        VerificationError::Storage {
            reason: err.to_string(),
        }
    }
}

/// Result type for verification operations
pub type VerificationResult<T> = Result<T, VerificationError>;
