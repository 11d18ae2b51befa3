//! # pc-01-canvas-store
//!
//! Canonical canvas state: the authoritative mapping coordinate → cell.
//!
//! ## Overview
//!
//! - **Striped arena**: one slot per coordinate, per-stripe locks, no global
//!   lock on the write path
//! - **Revisions**: every commit takes the next server-wide revision, so
//!   clients can drop duplicate and out-of-order deltas
//! - **Broadcast**: every commit is published on the shared bus before
//!   `commit` returns
//! - **Durability**: each cell is persisted under `cell:{x}:{y}` and reloaded
//!   on startup
//!
//! ```text
//! Admission Gate ──CommitRequest──→ Canvas Store ──CellCommitted──→ Event Bus ──→ WS fan-out
//!                                        │
//!                                        └── put(cell:x:y) ──→ KeyValueStore
//! ```
//!
//! Admission (credit checks) happens upstream. This crate only knows bounds.

pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

pub use domain::CanvasConfig;
pub use error::{CanvasError, CanvasResult};
pub use ports::inbound::{CanvasStoreApi, CommitRequest, LoadReport};
pub use service::CanvasStoreService;
