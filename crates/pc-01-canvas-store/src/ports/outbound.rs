//! Driven Ports (SPI - Outbound Dependencies)
//!
//! The store persists through the shared key-value port, announces commits on
//! the shared bus and stamps cells with an injectable clock.

pub use shared_bus::EventPublisher;
pub use shared_types::storage::{BatchOperation, KeyValueStore};
pub use shared_types::TimeSource;
