//! Domain layer for the API gateway

pub mod config;
pub mod views;

pub use config::GatewayConfig;
