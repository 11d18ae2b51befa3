//! # Canvas Events
//!
//! Defines all event types that flow through the shared bus.

use serde::{Deserialize, Serialize};
use shared_types::entities::{Cell, Identity, PaymentState, TransactionId};

/// All events that can be published to the event bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CanvasEvent {
    // =========================================================================
    // CANVAS STORE
    // =========================================================================
    /// A write was committed. This is the broadcast delta.
    CellCommitted(Cell),

    // =========================================================================
    // CREDIT LEDGER
    // =========================================================================
    /// A confirmed payment was credited.
    CreditApplied {
        identity: Identity,
        transaction_id: TransactionId,
        units: u64,
        balance: u64,
    },

    // =========================================================================
    // PAYMENT VERIFICATION
    // =========================================================================
    /// A verification machine reached a terminal state.
    PaymentSettled {
        transaction_id: TransactionId,
        identity: Identity,
        state: PaymentState,
        expected_units: u64,
    },
}

impl CanvasEvent {
    /// Get the topic for this event (for filtering).
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::CellCommitted(_) => EventTopic::Canvas,
            Self::CreditApplied { .. } => EventTopic::Ledger,
            Self::PaymentSettled { .. } => EventTopic::Payments,
        }
    }

    /// Name of the producing subsystem.
    #[must_use]
    pub fn source(&self) -> &'static str {
        match self {
            Self::CellCommitted(_) => "pc-01-canvas-store",
            Self::CreditApplied { .. } => "pc-02-credit-ledger",
            Self::PaymentSettled { .. } => "pc-03-payment-verification",
        }
    }
}

/// Event topics for subscription filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    Canvas,
    Ledger,
    Payments,
    /// All events (no filtering).
    All,
}

/// Filter for subscribing to specific events.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Topics to include. Empty means all topics.
    pub topics: Vec<EventTopic>,
}

impl EventFilter {
    /// Create a filter that accepts all events.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for specific topics.
    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self { topics }
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &CanvasEvent) -> bool {
        self.topics.is_empty()
            || self.topics.contains(&EventTopic::All)
            || self.topics.contains(&event.topic())
    }
}
