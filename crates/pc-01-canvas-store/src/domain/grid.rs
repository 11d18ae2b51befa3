//! Striped cell arena
//!
//! One slot per coordinate, addressed by the row-major index. Slots are
//! spread over `stripes` independent locks (`index % stripes`), so writers to
//! different cells rarely contend and there is no global lock on the write
//! path. Two writes to the same cell always serialize on the same stripe.

use parking_lot::{RwLock, RwLockWriteGuard};
use shared_types::{CanvasDimensions, Cell};

type Slots = Vec<Option<Box<Cell>>>;

pub struct StripedGrid {
    dimensions: CanvasDimensions,
    stripes: Vec<RwLock<Slots>>,
}

/// Exclusive access to one cell slot.
pub struct SlotGuard<'a> {
    guard: RwLockWriteGuard<'a, Slots>,
    offset: usize,
}

impl SlotGuard<'_> {
    pub fn current(&self) -> Option<&Cell> {
        self.guard[self.offset].as_deref()
    }

    pub fn replace(&mut self, cell: Cell) {
        self.guard[self.offset] = Some(Box::new(cell));
    }
}

impl StripedGrid {
    pub fn new(dimensions: CanvasDimensions, stripes: usize) -> Self {
        let stripes = stripes.max(1).min(dimensions.cell_count().max(1));
        let total = dimensions.cell_count();
        let stripes = (0..stripes)
            .map(|s| {
                // Stripe `s` owns indices s, s + n, s + 2n, ...
                let len = total / stripes + usize::from(s < total % stripes);
                RwLock::new((0..len).map(|_| None).collect())
            })
            .collect();
        Self { dimensions, stripes }
    }

    pub fn dimensions(&self) -> CanvasDimensions {
        self.dimensions
    }

    fn locate(&self, index: usize) -> (usize, usize) {
        let n = self.stripes.len();
        (index % n, index / n)
    }

    /// Lock the slot at `index` for writing.
    pub fn lock_slot(&self, index: usize) -> SlotGuard<'_> {
        let (stripe, offset) = self.locate(index);
        SlotGuard {
            guard: self.stripes[stripe].write(),
            offset,
        }
    }

    pub fn get(&self, index: usize) -> Option<Cell> {
        let (stripe, offset) = self.locate(index);
        self.stripes[stripe].read()[offset].as_deref().cloned()
    }

    /// Every written cell. Each stripe is read under its own lock, so the
    /// result is per-cell consistent.
    pub fn cells(&self) -> Vec<Cell> {
        let mut cells: Vec<Cell> = self
            .stripes
            .iter()
            .flat_map(|stripe| {
                stripe
                    .read()
                    .iter()
                    .filter_map(|slot| slot.as_deref().cloned())
                    .collect::<Vec<_>>()
            })
            .collect();
        cells.sort_by_key(|c| (c.y, c.x));
        cells
    }

    pub fn occupied(&self) -> usize {
        self.stripes
            .iter()
            .map(|stripe| stripe.read().iter().filter(|s| s.is_some()).count())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{Color, Coord, Identity, WriteId};

    fn cell(x: u32, y: u32, revision: u64) -> Cell {
        Cell {
            x,
            y,
            color: Color::from_rgb(9, 9, 9),
            owner: Identity::new("alice").unwrap(),
            written_at: 0,
            revision,
            write_id: WriteId::new(format!("w{revision}")).unwrap(),
        }
    }

    #[test]
    fn test_every_index_has_a_slot() {
        let dims = CanvasDimensions::new(7, 3);
        let grid = StripedGrid::new(dims, 4);
        for y in 0..3 {
            for x in 0..7 {
                let idx = dims.index_of(Coord::new(x, y)).unwrap();
                grid.lock_slot(idx).replace(cell(x, y, 1));
            }
        }
        assert_eq!(grid.occupied(), 21);
        assert_eq!(grid.cells().len(), 21);
    }

    #[test]
    fn test_more_stripes_than_cells() {
        let dims = CanvasDimensions::new(2, 1);
        let grid = StripedGrid::new(dims, 64);
        grid.lock_slot(1).replace(cell(1, 0, 1));
        assert_eq!(grid.get(1).map(|c| c.x), Some(1));
        assert!(grid.get(0).is_none());
    }

    #[test]
    fn test_replace_overwrites() {
        let grid = StripedGrid::new(CanvasDimensions::new(4, 4), 2);
        grid.lock_slot(5).replace(cell(1, 1, 1));
        grid.lock_slot(5).replace(cell(1, 1, 2));
        assert_eq!(grid.get(5).map(|c| c.revision), Some(2));
        assert_eq!(grid.occupied(), 1);
    }
}
