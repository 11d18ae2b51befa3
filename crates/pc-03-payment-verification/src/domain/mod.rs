//! Domain layer for payment verification

pub mod config;
pub mod payment;
pub mod record;
pub mod stats;

pub use config::{PricingConfig, VerificationConfig, DEFAULT_ORACLE_URL};
pub use payment::{Confirmation, PaymentEvent, PendingPayment, Transition};
pub use record::{decode_payment, encode_payment, payment_key, PAYMENT_PREFIX};
pub use stats::ConfirmationStats;
