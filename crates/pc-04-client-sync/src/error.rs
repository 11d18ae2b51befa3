//! Error types for the client engine

use shared_types::TransactionId;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// The server refused a write for lack of credit
    #[error("Out of credit (balance {balance})")]
    InsufficientCredit { balance: u64 },

    /// Coordinate outside the grid
    #[error("Coordinate ({x}, {y}) is outside the canvas")]
    OutOfBounds { x: u32, y: u32 },

    /// Any other refusal by the server
    #[error("Server rejected the request ({status} {code}): {message}")]
    Rejected {
        status: u16,
        code: String,
        message: String,
    },

    /// The request never got an answer
    #[error("Transport error: {0}")]
    Transport(String),

    /// The answer could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// The broadcast stream dropped
    #[error("Broadcast disconnected: {0}")]
    BroadcastDisconnected(String),

    /// The server gave up verifying a payment
    #[error("Verification of {0} timed out")]
    VerificationTimedOut(TransactionId),

    /// The payment will never credit
    #[error("Payment {transaction_id} failed: {reason}")]
    PaymentFailed {
        transaction_id: TransactionId,
        reason: String,
    },

    /// The loop or session was cancelled before finishing
    #[error("Cancelled")]
    Cancelled,
}

impl ClientError {
    /// Whether retrying the same request later can succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ClientError::Transport(_) | ClientError::BroadcastDisconnected(_)
        ) || matches!(self, ClientError::Rejected { status, .. } if *status >= 500)
    }
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;
