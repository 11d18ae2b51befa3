//! # pc-02-credit-ledger
//!
//! Per-identity write credits and the admission gate that spends them.
//!
//! ## Overview
//!
//! - **Ledger**: balances never go negative; a debit is a single
//!   check-and-decrement under the identity's lock
//! - **Idempotent credit**: each transaction id credits at most once, across
//!   restarts, because the balance and the applied marker are written in one
//!   atomic batch
//! - **Admission**: a write is committed only after a successful debit, and a
//!   failed commit refunds it
//!
//! ```text
//! Gateway ──WriteRequest──→ AdmissionGate ──try_debit──→ CreditLedger
//!                                │
//!                                └──AdmittedWrite──→ CellCommitter (pc-01)
//!
//! Payment Verification ──credit(identity, tx, units)──→ CreditLedger
//! ```

pub mod admission;
pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

pub use admission::AdmissionGate;
pub use domain::{AdmissionConfig, CreditOutcome, DebitOutcome, DenialReason, RejectionReason};
pub use error::{AdmissionError, AdmissionResult, LedgerError, LedgerResult};
pub use ports::inbound::{AdmissionApi, CreditLedgerApi, WriteReceipt, WriteRequest};
pub use ports::outbound::{AdmittedWrite, CellCommitter, CommitFailure};
pub use service::{CreditLedgerService, LedgerLoadReport};
