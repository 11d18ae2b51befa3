//! Persisted form of a payment
//!
//! Key layout:
//! - `payment:{transaction_id}` → bincode(`PendingPayment`)

use crate::domain::PendingPayment;
use crate::error::{VerificationError, VerificationResult};
use shared_types::TransactionId;

pub const PAYMENT_PREFIX: &[u8] = b"payment:";

pub fn payment_key(transaction_id: &TransactionId) -> Vec<u8> {
    [PAYMENT_PREFIX, transaction_id.as_str().as_bytes()].concat()
}

pub fn encode_payment(payment: &PendingPayment) -> VerificationResult<Vec<u8>> {
    bincode::serialize(payment).map_err(|e| VerificationError::Storage {
        reason: e.to_string(),
    })
}

pub fn decode_payment(key: &[u8], bytes: &[u8]) -> VerificationResult<PendingPayment> {
    bincode::deserialize(bytes).map_err(|e| VerificationError::Corrupted {
        key: String::from_utf8_lossy(key).into_owned(),
        reason: e.to_string(),
    })
}
