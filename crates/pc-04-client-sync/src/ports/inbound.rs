//! Driving Ports (API - Inbound)
//!
//! What the engine reports to its host (a UI or the headless CLI).

use crate::domain::BalanceSettlement;
use shared_types::{Color, Coord, PaymentState, TransactionId, WriteId};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// The visible color of a cell changed.
    CellChanged { coord: Coord, color: Option<Color> },
    /// The authoritative tier was replaced.
    SnapshotApplied { revision: u64, cells: usize },
    /// A local write was refused and rolled back.
    WriteRolledBack { write_id: WriteId, reason: String },
    /// The server reports no credit left.
    OutOfCredit { balance: u64 },
    /// Elapsed time since a payment was submitted.
    VerificationTick {
        transaction_id: TransactionId,
        elapsed: Duration,
    },
    /// The server reported a new state for a payment.
    VerificationState {
        transaction_id: TransactionId,
        state: PaymentState,
    },
    /// Balance reconciliation finished.
    BalanceSettled(BalanceSettlement),
    StreamConnected,
    StreamDisconnected { reason: String },
}
