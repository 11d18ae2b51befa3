//! Driving Ports (API - Inbound)

use crate::error::CanvasResult;
use async_trait::async_trait;
use shared_types::{CanvasDimensions, CanvasSnapshot, Cell, Color, Coord, Identity, Revision, WriteId};

/// A write that already passed admission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRequest {
    pub coord: Coord,
    pub color: Color,
    pub owner: Identity,
    pub write_id: WriteId,
}

/// Result of reloading persisted cells at startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub cells_loaded: usize,
    /// Records that were undecodable or outside the current grid.
    pub skipped: usize,
    pub revision: Revision,
}

/// Primary canvas store API
#[async_trait]
pub trait CanvasStoreApi: Send + Sync {
    /// Commit a cell, last writer wins.
    ///
    /// The delta is published on the bus before this returns.
    async fn commit(&self, request: CommitRequest) -> CanvasResult<Cell>;

    /// Current cell at `coord`, `None` if never written.
    fn get(&self, coord: Coord) -> CanvasResult<Option<Cell>>;

    /// Every written cell.
    fn snapshot(&self) -> CanvasSnapshot;

    /// Highest revision handed out so far.
    fn revision(&self) -> Revision;

    fn dimensions(&self) -> CanvasDimensions;
}
