//! Node runtime errors

use pc_01_canvas_store::CanvasError;
use pc_02_credit_ledger::LedgerError;
use pc_03_payment_verification::{OracleError, VerificationError};
use pc_05_api_gateway::GatewayError;
use shared_types::{ConfigError, KVStoreError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] KVStoreError),

    #[error("Canvas reload failed: {0}")]
    CanvasLoad(#[from] CanvasError),

    #[error("Ledger reload failed: {0}")]
    LedgerLoad(#[from] LedgerError),

    #[error("Payment reload failed: {0}")]
    PaymentLoad(#[from] VerificationError),

    #[error("Finality oracle setup failed: {0}")]
    Oracle(#[from] OracleError),

    #[error("API gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Cannot bind {addr}: {reason}")]
    Bind { addr: String, reason: String },

    #[error("Node already started")]
    AlreadyStarted,
}

pub type NodeResult<T> = Result<T, NodeError>;
