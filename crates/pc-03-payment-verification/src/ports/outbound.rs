//! Driven Ports (SPI - Outbound Dependencies)
//!
//! Production adapters:
//! - `FinalityOracle`: [`crate::adapters::KaspaRestOracle`]
//! - `CreditSink`: `LedgerCreditSink` in node-runtime over `pc-02-credit-ledger`
//! - `KeyValueStore`: the node's store, for `payment:` records

use crate::error::{CreditSinkError, OracleError};
use async_trait::async_trait;
use shared_types::{Identity, TransactionId};

pub use shared_bus::EventPublisher;
pub use shared_types::storage::KeyValueStore;
pub use shared_types::TimeSource;

/// What the oracle knows about a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OracleStatus {
    /// Included in a block.
    Confirmed {
        block_hash: String,
        block_height: Option<u64>,
    },
    /// Not seen yet; keep polling.
    NotSeen,
    /// Will never confirm.
    Rejected { reason: String },
}

/// External transaction finality source.
#[async_trait]
pub trait FinalityOracle: Send + Sync {
    async fn check(&self, transaction_id: &TransactionId) -> Result<OracleStatus, OracleError>;

    /// One-off query independent of any scan state, used by reconciliation
    /// after the payment's own polling has ended.
    async fn lookup(&self, transaction_id: &TransactionId) -> Result<OracleStatus, OracleError> {
        self.check(transaction_id).await
    }

    /// Drop any per-transaction scan state.
    fn forget(&self, _transaction_id: &TransactionId) {}
}

/// Result of handing a confirmed payment to the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreditReceipt {
    Applied { balance: u64 },
    /// The ledger had already credited this transaction id.
    AlreadyApplied,
}

/// The ledger as seen by verification.
#[async_trait]
pub trait CreditSink: Send + Sync {
    async fn credit(
        &self,
        identity: &Identity,
        transaction_id: &TransactionId,
        units: u64,
    ) -> Result<CreditReceipt, CreditSinkError>;

    fn balance_of(&self, identity: &Identity) -> u64;

    /// True once the ledger has applied this transaction id.
    fn is_credited(&self, transaction_id: &TransactionId) -> bool;
}
