//! Adapters for the client engine
//!
//! - [`http::HttpCanvasApi`]: reqwest client for the `/api/v1` routes
//! - [`broadcast::BroadcastClient`]: WebSocket stream with heartbeat and
//!   backoff reconnect

pub mod broadcast;
pub mod http;

pub use broadcast::{BroadcastClient, StreamEvent};
pub use http::HttpCanvasApi;
