//! # pc-04-client-sync
//!
//! Client side of the canvas: an optimistic local view that converges on the
//! server's authoritative state.
//!
//! ## Overview
//!
//! - **Two tiers**: authoritative cells from snapshots and deltas, with
//!   unacknowledged local writes on top (see [`domain::LocalCanvas`])
//! - **Optimistic writes**: shown immediately, rolled back when the server
//!   refuses them
//! - **Credit estimate**: last server balance minus in-flight reservations
//! - **Payment follow-up**: elapsed ticker, verification mirror and balance
//!   reconciliation, each bound to a cancellation token
//!
//! ```text
//! BroadcastClient ──StreamEvent──→ ClientEngine ──ClientEvent──→ host
//!                                      │
//!                     CanvasApi ←──────┘ (place, purchase, verify, balance)
//! ```

pub mod adapters;
pub mod domain;
pub mod engine;
pub mod error;
pub mod ports;

pub use adapters::{BroadcastClient, HttpCanvasApi, StreamEvent};
pub use domain::{
    BalanceSettlement, BalanceWatch, ClientTimingConfig, LocalCanvas, LocalCreditEstimate,
    MergeOutcome, WatchStep, WatchStop,
};
pub use engine::{ClientEngine, PurchaseOutcome, PurchaseSession};
pub use error::{ClientError, ClientResult};
pub use ports::inbound::ClientEvent;
pub use ports::outbound::CanvasApi;
