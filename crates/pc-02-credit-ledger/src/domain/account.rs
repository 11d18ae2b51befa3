//! Ledger entities and their persisted form
//!
//! Key layout:
//! - `balance:{identity}` → bincode(`u64`)
//! - `applied:{transaction_id}` → bincode(`AppliedCredit`)

use crate::error::{LedgerError, LedgerResult};
use serde::{Deserialize, Serialize};
use shared_types::{Identity, Timestamp, TransactionId};

pub const BALANCE_PREFIX: &[u8] = b"balance:";
pub const APPLIED_PREFIX: &[u8] = b"applied:";

/// Spendable write units of one identity. Never negative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Account {
    pub balance: u64,
}

/// Durable marker that a transaction id has been credited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedCredit {
    pub identity: Identity,
    pub units: u64,
    pub applied_at: Timestamp,
}

/// Outcome of `try_debit`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebitOutcome {
    Granted { remaining: u64 },
    Denied(DenialReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenialReason {
    InsufficientCredit { balance: u64 },
}

/// Outcome of `credit`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreditOutcome {
    Applied { balance: u64 },
    /// The transaction id was already credited. Not an error; nothing changed.
    Rejected(RejectionReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectionReason {
    DuplicateTransaction { credited_to: Identity },
}

pub fn balance_key(identity: &Identity) -> Vec<u8> {
    [BALANCE_PREFIX, identity.as_str().as_bytes()].concat()
}

pub fn applied_key(transaction_id: &TransactionId) -> Vec<u8> {
    [APPLIED_PREFIX, transaction_id.as_str().as_bytes()].concat()
}

pub fn encode_balance(balance: u64) -> LedgerResult<Vec<u8>> {
    bincode::serialize(&balance).map_err(|e| LedgerError::Storage {
        reason: e.to_string(),
    })
}

pub fn decode_balance(key: &[u8], bytes: &[u8]) -> LedgerResult<u64> {
    bincode::deserialize(bytes).map_err(|e| corrupted(key, e))
}

pub fn encode_applied(record: &AppliedCredit) -> LedgerResult<Vec<u8>> {
    bincode::serialize(record).map_err(|e| LedgerError::Storage {
        reason: e.to_string(),
    })
}

pub fn decode_applied(key: &[u8], bytes: &[u8]) -> LedgerResult<AppliedCredit> {
    bincode::deserialize(bytes).map_err(|e| corrupted(key, e))
}

fn corrupted(key: &[u8], err: bincode::Error) -> LedgerError {
    LedgerError::Corrupted {
        key: String::from_utf8_lossy(key).into_owned(),
        reason: err.to_string(),
    }
}
