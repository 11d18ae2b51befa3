//! Two-tier local canvas
//!
//! - **Authoritative tier**: cells as the server broadcast them, keyed by
//!   coordinate, each with its revision
//! - **Optimistic tier**: local writes not yet acknowledged, in submission
//!   order
//!
//! A read shows the newest optimistic write for the coordinate, falling back
//! to the authoritative cell. An inbound delta wins over the optimistic tier
//! for its coordinate; a delta whose revision is not above the cell's current
//! revision is dropped.

use shared_types::{CanvasDimensions, CanvasSnapshot, Cell, Color, Coord, Revision, WriteId};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingWrite {
    write_id: WriteId,
    coord: Coord,
    color: Color,
}

/// Result of merging one delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Applied,
    /// Same revision already merged.
    Duplicate,
    /// Older than the cell's current revision.
    Stale,
}

#[derive(Debug, Clone)]
pub struct LocalCanvas {
    dimensions: CanvasDimensions,
    authoritative: HashMap<Coord, Cell>,
    pending: Vec<PendingWrite>,
    revision: Revision,
}

impl LocalCanvas {
    pub fn new(dimensions: CanvasDimensions) -> Self {
        Self {
            dimensions,
            authoritative: HashMap::new(),
            pending: Vec::new(),
            revision: 0,
        }
    }

    pub fn dimensions(&self) -> CanvasDimensions {
        self.dimensions
    }

    /// Highest authoritative revision seen.
    pub fn revision(&self) -> Revision {
        self.revision
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(&self, write_id: &WriteId) -> bool {
        self.pending.iter().any(|p| &p.write_id == write_id)
    }

    /// Visible color at `coord`.
    pub fn view(&self, coord: Coord) -> Option<Color> {
        self.pending
            .iter()
            .rev()
            .find(|p| p.coord == coord)
            .map(|p| p.color)
            .or_else(|| self.authoritative.get(&coord).map(|c| c.color))
    }

    pub fn authoritative(&self, coord: Coord) -> Option<&Cell> {
        self.authoritative.get(&coord)
    }

    /// Every visible cell color.
    pub fn visible(&self) -> BTreeMap<Coord, Color> {
        let mut view: BTreeMap<Coord, Color> = self
            .authoritative
            .iter()
            .map(|(coord, cell)| (*coord, cell.color))
            .collect();
        for p in &self.pending {
            view.insert(p.coord, p.color);
        }
        view
    }

    /// Show a local write immediately. Returns false for an out-of-grid
    /// coordinate.
    pub fn apply_local(&mut self, write_id: WriteId, coord: Coord, color: Color) -> bool {
        if !self.dimensions.contains(coord) {
            return false;
        }
        self.pending.push(PendingWrite {
            write_id,
            coord,
            color,
        });
        true
    }

    /// Merge one authoritative cell.
    pub fn merge_delta(&mut self, cell: Cell) -> MergeOutcome {
        let coord = cell.coord();

        if let Some(current) = self.authoritative.get(&coord) {
            if cell.revision == current.revision {
                return MergeOutcome::Duplicate;
            }
            if cell.revision < current.revision {
                return MergeOutcome::Stale;
            }
        }

        self.pending.retain(|p| p.coord != coord);
        self.revision = self.revision.max(cell.revision);
        self.authoritative.insert(coord, cell);
        MergeOutcome::Applied
    }

    /// Replace the authoritative tier. Cells merged after the snapshot was
    /// taken (revision above the snapshot's) survive, and per coordinate the
    /// higher revision wins. Optimistic writes not contained in the result
    /// stay on top.
    pub fn apply_snapshot(&mut self, snapshot: CanvasSnapshot) {
        let mut cells = HashMap::with_capacity(snapshot.cells.len());
        let mut revision = snapshot.revision;
        for cell in snapshot.cells {
            if !self.dimensions.contains(cell.coord()) {
                continue;
            }
            revision = revision.max(cell.revision);
            cells.insert(cell.coord(), cell);
        }

        for (coord, current) in self.authoritative.drain() {
            let newer = match cells.get(&coord) {
                Some(incoming) => current.revision > incoming.revision,
                None => current.revision > snapshot.revision,
            };
            if newer {
                revision = revision.max(current.revision);
                cells.insert(coord, current);
            }
        }

        self.pending
            .retain(|p| !cells.values().any(|c| c.write_id == p.write_id));
        self.authoritative = cells;
        self.revision = revision;
    }

    /// The server committed a local write.
    pub fn acknowledge(&mut self, write_id: &WriteId, cell: Cell) -> MergeOutcome {
        self.pending.retain(|p| &p.write_id != write_id);
        self.merge_delta(cell)
    }

    /// The server refused a local write. Returns the color now visible at the
    /// coordinate, if the write was still pending.
    pub fn rollback(&mut self, write_id: &WriteId) -> Option<Option<Color>> {
        let index = self.pending.iter().position(|p| &p.write_id == write_id)?;
        let removed = self.pending.remove(index);
        Some(self.view(removed.coord))
    }
}
