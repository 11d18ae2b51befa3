//! # pc-05-api-gateway
//!
//! External interface of the canvas: REST routes under `/api/v1` and the
//! WebSocket broadcast stream at `/ws`.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     API GATEWAY (pc-05)                      │
//! │  Trace → CORS → Timeout (REST only)                          │
//! │                                                              │
//! │  /api/v1/pixels ───────────→ AdmissionApi (pc-02)            │
//! │  /api/v1/wallets/../balance → CreditLedgerApi (pc-02)        │
//! │  /api/v1/purchases ─────────→ VerificationApi (pc-03)        │
//! │  /api/v1/transactions/.. ───→ VerificationApi (pc-03)        │
//! │  /api/v1/canvas, /pixels ───→ CanvasReader (pc-01)           │
//! │  /ws ←── CellCommitted ←──── Event Bus                       │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Failures leave as `{"error", "code"}` with a status chosen per variant,
//! see [`GatewayError::status_and_code`].

pub mod domain;
pub mod error;
pub mod ports;
pub mod router;
pub mod service;
pub mod ws;

#[cfg(test)]
mod test_support;

pub use domain::GatewayConfig;
pub use error::{GatewayError, GatewayResult};
pub use ports::outbound::CanvasReader;
pub use router::{build_router, GatewayState, StreamSettings};
pub use service::ApiGatewayService;
