//! # Integration Tests
//!
//! Cross-subsystem behavior that no single crate can check on its own.

pub mod client_flows;
pub mod scenarios;
