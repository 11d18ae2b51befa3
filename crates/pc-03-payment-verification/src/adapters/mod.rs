//! Outbound adapters

pub mod kaspa_rest;

pub use kaspa_rest::KaspaRestOracle;
