//! Driven Ports (SPI - Outbound Dependencies)
//!
//! Production adapters live in node-runtime/adapters.

use async_trait::async_trait;
use shared_types::{CanvasDimensions, Cell, Color, Coord, Identity, WriteId};
use thiserror::Error;

pub use shared_bus::EventPublisher;
pub use shared_types::storage::{BatchOperation, KeyValueStore};
pub use shared_types::TimeSource;

/// A write that passed the credit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmittedWrite {
    pub coord: Coord,
    pub color: Color,
    pub owner: Identity,
    pub write_id: WriteId,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommitFailure {
    #[error("coordinate {0} out of bounds")]
    OutOfBounds(Coord),
    #[error("{0}")]
    Store(String),
}

/// The canonical store as seen by the gate.
///
/// Production: `CanvasCommitterAdapter` over `pc-01-canvas-store`
#[async_trait]
pub trait CellCommitter: Send + Sync {
    fn dimensions(&self) -> CanvasDimensions;

    /// Commit and broadcast. Returns once the delta is published.
    async fn commit(&self, write: AdmittedWrite) -> Result<Cell, CommitFailure>;
}
