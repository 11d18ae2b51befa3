//! # Canvas Store Adapter
//!
//! Exposes `pc-01-canvas-store` through the ports its consumers define:
//! - [`CellCommitter`] for the admission gate (pc-02)
//! - [`CanvasReader`] for the API gateway (pc-05)

use async_trait::async_trait;
use pc_01_canvas_store::{CanvasError, CanvasStoreApi, CommitRequest};
use pc_02_credit_ledger::{AdmittedWrite, CellCommitter, CommitFailure};
use pc_05_api_gateway::CanvasReader;
use shared_types::{CanvasDimensions, CanvasSnapshot, Cell, Coord};
use std::sync::Arc;

pub struct CanvasStoreAdapter<S: CanvasStoreApi> {
    store: Arc<S>,
}

impl<S: CanvasStoreApi> CanvasStoreAdapter<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<S: CanvasStoreApi + 'static> CellCommitter for CanvasStoreAdapter<S> {
    fn dimensions(&self) -> CanvasDimensions {
        self.store.dimensions()
    }

    async fn commit(&self, write: AdmittedWrite) -> Result<Cell, CommitFailure> {
        let request = CommitRequest {
            coord: write.coord,
            color: write.color,
            owner: write.owner,
            write_id: write.write_id,
        };
        self.store.commit(request).await.map_err(|e| match e {
            CanvasError::OutOfBounds { x, y, .. } => CommitFailure::OutOfBounds(Coord::new(x, y)),
            other => CommitFailure::Store(other.to_string()),
        })
    }
}

impl<S: CanvasStoreApi + 'static> CanvasReader for CanvasStoreAdapter<S> {
    fn snapshot(&self) -> CanvasSnapshot {
        self.store.snapshot()
    }

    fn dimensions(&self) -> CanvasDimensions {
        self.store.dimensions()
    }
}
