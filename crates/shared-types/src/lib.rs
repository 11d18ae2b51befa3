//! # Shared Types Crate
//!
//! Domain entities, wire messages and the key-value storage port shared by
//! every canvas subsystem and by the client.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: cells, identities and transaction ids are
//!   defined once here and validated at construction.
//! - **Wire Stability**: `api` and `stream` types are the JSON contract between
//!   the gateway and clients.
//! - **Storage Agnostic**: subsystems persist through [`KeyValueStore`] and never
//!   see the engine behind it.

pub mod api;
pub mod duration_serde;
pub mod entities;
pub mod errors;
pub mod storage;
pub mod stream;

pub use api::*;
pub use entities::*;
pub use errors::*;
pub use storage::{BatchOperation, InMemoryKVStore, KeyValueStore};
pub use stream::StreamMessage;
