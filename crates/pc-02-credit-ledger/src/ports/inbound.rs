//! Driving Ports (API - Inbound)

use crate::domain::{CreditOutcome, DebitOutcome};
use crate::error::{AdmissionResult, LedgerResult};
use async_trait::async_trait;
use shared_types::{Cell, Color, Coord, Identity, TransactionId, WriteId};

/// Credit ledger API
///
/// Debits and credits of one identity are serialized; different identities
/// proceed concurrently.
#[async_trait]
pub trait CreditLedgerApi: Send + Sync {
    /// Atomically check and decrement. Denied at insufficient balance.
    fn try_debit(&self, identity: &Identity, units: u64) -> LedgerResult<DebitOutcome>;

    /// Return units taken by a debit whose write never committed.
    fn refund(&self, identity: &Identity, units: u64) -> LedgerResult<u64>;

    /// Increment once per transaction id. A repeated id is a no-op.
    async fn credit(
        &self,
        identity: &Identity,
        transaction_id: &TransactionId,
        units: u64,
    ) -> LedgerResult<CreditOutcome>;

    /// Current balance, zero for unknown identities.
    fn balance_of(&self, identity: &Identity) -> u64;

    /// Whether a transaction id has already been credited.
    fn is_credited(&self, transaction_id: &TransactionId) -> bool;
}

/// A write request entering the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRequest {
    pub coord: Coord,
    pub color: Color,
    pub identity: Identity,
    pub write_id: WriteId,
}

/// An accepted write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteReceipt {
    pub cell: Cell,
    pub remaining_balance: u64,
    /// True when this write id had already been committed and the original
    /// cell is being returned.
    pub replayed: bool,
}

/// The write path: credit check then commit.
#[async_trait]
pub trait AdmissionApi: Send + Sync {
    async fn write(&self, request: WriteRequest) -> AdmissionResult<WriteReceipt>;
}
