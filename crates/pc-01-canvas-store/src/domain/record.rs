//! Persisted cell records
//!
//! Key layout: `cell:{x}:{y}` → bincode(`Cell`).

use crate::error::{CanvasError, CanvasResult};
use shared_types::{Cell, Coord};

pub const CELL_PREFIX: &[u8] = b"cell:";

pub fn cell_key(coord: Coord) -> Vec<u8> {
    format!("cell:{}:{}", coord.x, coord.y).into_bytes()
}

pub fn encode_cell(cell: &Cell) -> CanvasResult<Vec<u8>> {
    bincode::serialize(cell).map_err(|e| CanvasError::Storage {
        reason: format!("encode cell {}: {}", cell.coord(), e),
    })
}

pub fn decode_cell(key: &[u8], bytes: &[u8]) -> CanvasResult<Cell> {
    bincode::deserialize(bytes).map_err(|e| CanvasError::Corrupted {
        key: String::from_utf8_lossy(key).into_owned(),
        reason: e.to_string(),
    })
}
