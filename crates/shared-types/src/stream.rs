//! # Broadcast Stream Messages
//!
//! JSON frames exchanged over the `/ws` stream:
//! `{"type": "snapshot" | "delta" | "ping" | "pong", "payload": ...}`.

use crate::entities::{CanvasSnapshot, Cell};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum StreamMessage {
    /// Full authoritative state. Sent on connect and after a resync.
    Snapshot(CanvasSnapshot),
    /// One committed cell.
    Delta(Cell),
    Ping,
    Pong,
}

impl StreamMessage {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}
