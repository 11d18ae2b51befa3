//! Pending payment state machine
//!
//! ```text
//! [SUBMITTED] ──poll started──→ [POLLING] ──not seen / oracle error──→ [POLLING]
//!                                   │
//!                                   ├── confirmed ──→ [CONFIRMED]  (one credit)
//!                                   ├── rejected ──→ [FAILED]
//!                                   ├── window closed ──→ [TIMED_OUT]
//!                                   └── stopped ──→ [TIMED_OUT]
//!
//! [SUBMITTED] ──already credited──→ [CONFIRMED]  (no credit)
//!
//! [TIMED_OUT | FAILED] ──reconciled──→ [CONFIRMED]
//! ```
//!
//! Terminal states ignore every event except `Reconciled`.

use serde::{Deserialize, Serialize};
use shared_types::{Identity, PaymentState, Timestamp, TransactionId};

/// Events driving a payment.
#[derive(Debug, Clone, PartialEq)]
pub enum PaymentEvent {
    /// The verification task took the first poll.
    PollStarted,
    /// The oracle has not seen the transaction yet.
    NotSeen,
    /// The oracle query failed. The payment keeps polling.
    OracleFailed { reason: String },
    /// The oracle reports the transaction in a block.
    Confirmed(Confirmation),
    /// The oracle reports the transaction will never confirm.
    Rejected { reason: String },
    /// The verification window closed without confirmation.
    DeadlineExceeded,
    /// Manual reconciliation found the transaction confirmed.
    Reconciled(Confirmation),
    /// Polling stopped before the payment settled, on request or because
    /// the node restarted.
    Stopped { reason: String },
    /// The ledger already holds the credit for this transaction id.
    AlreadyCredited,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Confirmation {
    /// None when verification is disabled.
    pub block_hash: Option<String>,
    pub block_height: Option<u64>,
    pub confirmed_at: Timestamp,
    /// Seconds from submission to confirmation.
    pub confirmation_time: f64,
}

/// Outcome of feeding an event to a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Moved { from: PaymentState, to: PaymentState },
    Stayed,
    Ignored,
}

impl Transition {
    /// True when this transition is the single move into `Confirmed`.
    pub fn confirmed(&self) -> bool {
        matches!(
            self,
            Transition::Moved {
                to: PaymentState::Confirmed,
                ..
            }
        )
    }

    pub fn entered_terminal(&self) -> bool {
        matches!(self, Transition::Moved { to, .. } if to.is_terminal())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingPayment {
    pub transaction_id: TransactionId,
    pub identity: Identity,
    pub expected_units: u64,
    pub amount_sompi: u64,
    pub state: PaymentState,
    pub submitted_at: Timestamp,
    pub confirmed_at: Option<Timestamp>,
    pub confirmation_time: Option<f64>,
    pub poll_count: u32,
    pub last_oracle_error: Option<String>,
    pub failure_reason: Option<String>,
    pub block_hash: Option<String>,
    pub block_height: Option<u64>,
    /// Set once the ledger accepted (or had already applied) the credit.
    pub credited: bool,
}

impl PendingPayment {
    pub fn new(
        transaction_id: TransactionId,
        identity: Identity,
        expected_units: u64,
        amount_sompi: u64,
        submitted_at: Timestamp,
    ) -> Self {
        Self {
            transaction_id,
            identity,
            expected_units,
            amount_sompi,
            state: PaymentState::Submitted,
            submitted_at,
            confirmed_at: None,
            confirmation_time: None,
            poll_count: 0,
            last_oracle_error: None,
            failure_reason: None,
            block_hash: None,
            block_height: None,
            credited: false,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Apply an event. Deterministic; no I/O.
    pub fn process_event(&mut self, event: PaymentEvent) -> Transition {
        let from = self.state;

        if from.is_terminal() {
            return match event {
                PaymentEvent::Reconciled(confirmation) if from != PaymentState::Confirmed => {
                    self.record_confirmation(confirmation);
                    self.move_to(PaymentState::Confirmed)
                }
                _ => Transition::Ignored,
            };
        }

        match event {
            PaymentEvent::PollStarted => {
                if from == PaymentState::Submitted {
                    self.move_to(PaymentState::Polling)
                } else {
                    Transition::Stayed
                }
            }
            PaymentEvent::NotSeen => {
                self.poll_count += 1;
                self.last_oracle_error = None;
                self.move_to(PaymentState::Polling)
            }
            PaymentEvent::OracleFailed { reason } => {
                self.poll_count += 1;
                self.last_oracle_error = Some(reason);
                self.move_to(PaymentState::Polling)
            }
            PaymentEvent::Confirmed(confirmation) | PaymentEvent::Reconciled(confirmation) => {
                self.poll_count += 1;
                self.record_confirmation(confirmation);
                self.move_to(PaymentState::Confirmed)
            }
            PaymentEvent::Rejected { reason } => {
                self.poll_count += 1;
                self.failure_reason = Some(reason);
                self.move_to(PaymentState::Failed)
            }
            PaymentEvent::DeadlineExceeded => self.move_to(PaymentState::TimedOut),
            PaymentEvent::Stopped { reason } => {
                self.failure_reason = Some(reason);
                self.move_to(PaymentState::TimedOut)
            }
            PaymentEvent::AlreadyCredited => {
                self.credited = true;
                self.move_to(PaymentState::Confirmed)
            }
        }
    }

    fn record_confirmation(&mut self, confirmation: Confirmation) {
        self.block_hash = confirmation.block_hash;
        self.block_height = confirmation.block_height;
        self.confirmed_at = Some(confirmation.confirmed_at);
        self.confirmation_time = Some(confirmation.confirmation_time);
        self.last_oracle_error = None;
    }

    fn move_to(&mut self, to: PaymentState) -> Transition {
        let from = self.state;
        if from == to {
            return Transition::Stayed;
        }
        self.state = to;
        Transition::Moved { from, to }
    }
}
