//! # pc-03-payment-verification
//!
//! Turns submitted payments into write credits once the finality oracle
//! confirms them.
//!
//! ## Overview
//!
//! - **State machine**: `Submitted → Polling → {Confirmed | TimedOut | Failed}`
//!   per transaction id, see [`domain::payment`]
//! - **One task per payment**: polls the oracle at a fixed interval until a
//!   terminal state or the verification window closes
//! - **Exactly one credit**: only the transition into `Confirmed` credits,
//!   and the ledger rejects a repeated transaction id
//! - **Manual reconciliation**: a TimedOut or Failed payment can be checked
//!   once more on request
//! - **Durable records**: payments are stored under `payment:{id}` and
//!   reloaded on startup
//!
//! ```text
//! Gateway ──submit──→ VerificationService ──spawn──→ poll task
//!                                                     │
//!                         FinalityOracle ←──check────┤
//!                         CreditSink     ←──credit───┘ (on Confirmed)
//! ```

pub mod adapters;
pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

pub use adapters::KaspaRestOracle;
pub use domain::{
    ConfirmationStats, PaymentEvent, PendingPayment, PricingConfig, Transition,
    VerificationConfig, DEFAULT_ORACLE_URL,
};
pub use error::{CreditSinkError, OracleError, VerificationError, VerificationResult};
pub use ports::inbound::{PaymentRequest, SubmitOutcome, VerificationApi};
pub use ports::outbound::{CreditReceipt, CreditSink, FinalityOracle, OracleStatus};
pub use service::{PaymentLoadReport, VerificationService};
