//! Canvas Store Service - Core business logic

use crate::domain::record::{cell_key, decode_cell, encode_cell, CELL_PREFIX};
use crate::domain::{CanvasConfig, StripedGrid};
use crate::error::{CanvasError, CanvasResult};
use crate::ports::inbound::{CanvasStoreApi, CommitRequest, LoadReport};
use crate::ports::outbound::{EventPublisher, KeyValueStore, TimeSource};
use async_trait::async_trait;
use canvas_telemetry::{log_cell_event, CANVAS_REVISION};
use shared_bus::CanvasEvent;
use shared_types::{CanvasDimensions, CanvasSnapshot, Cell, Coord, Revision};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

const SUBSYSTEM: &str = "pc-01";

/// Canvas store implementation
///
/// Commit path:
/// 1. bounds check
/// 2. lock the cell's stripe, take the next revision, persist, replace the slot
/// 3. release the stripe, publish the delta
pub struct CanvasStoreService<K, P>
where
    K: KeyValueStore,
    P: EventPublisher,
{
    grid: StripedGrid,
    revision: AtomicU64,
    store: Arc<K>,
    publisher: Arc<P>,
    clock: Arc<dyn TimeSource>,
}

impl<K, P> CanvasStoreService<K, P>
where
    K: KeyValueStore,
    P: EventPublisher,
{
    /// Create an empty store.
    pub fn new(
        config: &CanvasConfig,
        store: Arc<K>,
        publisher: Arc<P>,
        clock: Arc<dyn TimeSource>,
    ) -> Self {
        Self {
            grid: StripedGrid::new(config.dimensions(), config.lock_stripes),
            revision: AtomicU64::new(0),
            store,
            publisher,
            clock,
        }
    }

    /// Reload every persisted cell into the arena.
    ///
    /// Undecodable records and cells outside the current grid are skipped
    /// and logged. The revision counter resumes after the highest loaded
    /// revision.
    pub fn load_from_store(&self) -> CanvasResult<LoadReport> {
        let dims = self.grid.dimensions();
        let mut report = LoadReport::default();

        for (key, value) in self.store.prefix_scan(CELL_PREFIX)? {
            let cell = match decode_cell(&key, &value) {
                Ok(cell) => cell,
                Err(e) => {
                    warn!(subsystem = SUBSYSTEM, error = %e, "Skipping corrupted cell record");
                    report.skipped += 1;
                    continue;
                }
            };

            let Some(index) = dims.index_of(cell.coord()) else {
                warn!(
                    subsystem = SUBSYSTEM,
                    x = cell.x,
                    y = cell.y,
                    "Skipping persisted cell outside the canvas"
                );
                report.skipped += 1;
                continue;
            };

            let mut slot = self.grid.lock_slot(index);
            if slot.current().map_or(true, |c| c.revision < cell.revision) {
                report.revision = report.revision.max(cell.revision);
                slot.replace(cell);
                report.cells_loaded += 1;
            }
        }

        self.revision.fetch_max(report.revision, Ordering::SeqCst);
        CANVAS_REVISION.set(self.revision.load(Ordering::SeqCst) as f64);

        info!(
            subsystem = SUBSYSTEM,
            cells = report.cells_loaded,
            skipped = report.skipped,
            revision = report.revision,
            "Canvas loaded from store"
        );
        Ok(report)
    }

    /// Number of cells written at least once.
    pub fn occupied(&self) -> usize {
        self.grid.occupied()
    }

    fn index_of(&self, coord: Coord) -> CanvasResult<usize> {
        let dims = self.grid.dimensions();
        dims.index_of(coord).ok_or(CanvasError::OutOfBounds {
            x: coord.x,
            y: coord.y,
            width: dims.width,
            height: dims.height,
        })
    }
}

#[async_trait]
impl<K, P> CanvasStoreApi for CanvasStoreService<K, P>
where
    K: KeyValueStore + 'static,
    P: EventPublisher + 'static,
{
    async fn commit(&self, request: CommitRequest) -> CanvasResult<Cell> {
        let index = self.index_of(request.coord)?;

        let cell = {
            let mut slot = self.grid.lock_slot(index);

            // Taken under the stripe lock so revisions of one cell follow commit order.
            let revision = self.revision.fetch_add(1, Ordering::SeqCst) + 1;
            let cell = Cell {
                x: request.coord.x,
                y: request.coord.y,
                color: request.color,
                owner: request.owner,
                written_at: self.clock.now(),
                revision,
                write_id: request.write_id,
            };

            self.store
                .put(&cell_key(request.coord), &encode_cell(&cell)?)?;
            slot.replace(cell.clone());
            cell
        };

        CANVAS_REVISION.set(cell.revision as f64);
        log_cell_event!(
            debug,
            SUBSYSTEM,
            "Cell committed",
            cell.x,
            cell.y,
            revision = cell.revision,
            owner = %cell.owner
        );

        self.publisher
            .publish(CanvasEvent::CellCommitted(cell.clone()))
            .await;
        Ok(cell)
    }

    fn get(&self, coord: Coord) -> CanvasResult<Option<Cell>> {
        let index = self.index_of(coord)?;
        Ok(self.grid.get(index))
    }

    fn snapshot(&self) -> CanvasSnapshot {
        let cells = self.grid.cells();
        let revision = cells.iter().map(|c| c.revision).max().unwrap_or(0);
        CanvasSnapshot { revision, cells }
    }

    fn revision(&self) -> Revision {
        self.revision.load(Ordering::SeqCst)
    }

    fn dimensions(&self) -> CanvasDimensions {
        self.grid.dimensions()
    }
}
