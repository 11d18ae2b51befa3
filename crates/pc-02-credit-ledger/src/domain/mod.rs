//! Domain layer for the credit ledger

pub mod account;
pub mod config;
pub mod write_registry;

pub use account::{
    Account, AppliedCredit, CreditOutcome, DebitOutcome, DenialReason, RejectionReason,
};
pub use config::AdmissionConfig;
pub use write_registry::{Claim, WriteRegistry};
