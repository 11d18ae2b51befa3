//! # HTTP API Payloads
//!
//! Request and response bodies of the `/api/v1` surface. The gateway serves
//! them and the client decodes them, so both sides share these definitions.
//!
//! Durations on this surface are seconds as `f64`.

use crate::entities::{Cell, PaymentState, Revision};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `POST /api/v1/pixels`
///
/// Raw strings are validated by the gateway so malformed input maps to a
/// typed 400 instead of a deserialization failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacePixelRequest {
    pub x: u32,
    pub y: u32,
    pub color: String,
    pub wallet_address: String,
    /// Idempotency key of this write.
    pub transaction_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacePixelResponse {
    pub message: String,
    pub pixel: Cell,
    pub remaining_balance: u64,
}

/// `GET /api/v1/canvas`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CanvasStateResponse {
    /// `"x,y"` → `#RRGGBB`
    pub canvas_state: BTreeMap<String, String>,
    pub revision: Revision,
}

/// `GET /api/v1/wallets/{address}/balance`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub wallet_address: String,
    pub pixel_balance: u64,
}

/// `POST /api/v1/purchases`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseRequest {
    pub wallet_address: String,
    pub transaction_id: String,
    /// Paid amount in sompi.
    pub amount_sompi: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseStatus {
    Pending,
    Confirmed,
    TimedOut,
    Failed,
}

impl From<PaymentState> for PurchaseStatus {
    fn from(state: PaymentState) -> Self {
        match state {
            PaymentState::Submitted | PaymentState::Polling => PurchaseStatus::Pending,
            PaymentState::Confirmed => PurchaseStatus::Confirmed,
            PaymentState::TimedOut => PurchaseStatus::TimedOut,
            PaymentState::Failed => PurchaseStatus::Failed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseResponse {
    pub status: PurchaseStatus,
    pub transaction_id: String,
    pub estimated_pixels: u64,
    pub current_balance: u64,
    pub message: String,
}

/// `GET /api/v1/transactions/{id}/verify` and the manual reconcile result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub transaction_id: String,
    pub verified: bool,
    pub state: PaymentState,
    pub confirmation_time: Option<f64>,
    pub fastest_time: Option<f64>,
    pub block_hash: Option<String>,
    pub block_height: Option<u64>,
    pub poll_count: u32,
    pub message: String,
    pub error: Option<String>,
}

/// Per-transaction confirmation timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionMetrics {
    pub transaction_id: String,
    /// Submission time, milliseconds since epoch.
    pub start_time: u64,
    pub confirmed: bool,
    pub confirmation_time: Option<f64>,
}

/// Aggregate confirmation timing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub fastest_time: Option<f64>,
    pub average_time: Option<f64>,
    pub total_transactions: u64,
    pub confirmed_transactions: u64,
}

/// `GET /api/v1/transactions/metrics[?transaction_id=]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricsResponse {
    Transaction(TransactionMetrics),
    Summary(MetricsSummary),
}

/// `GET /api/v1/config`: the client-facing, session-static configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub pixel_pack_cost_sompi: u64,
    pub pixel_pack_size: u64,
    pub receiver_address: Option<String>,
    pub verify_transactions: bool,
    pub verification_timeout_ms: u64,
    pub transaction_check_interval_ms: u64,
    pub balance_poll_interval_ms: u64,
    pub balance_max_wait_ms: u64,
    pub balance_anomaly_threshold: u32,
}

/// Error body returned by every failing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}
