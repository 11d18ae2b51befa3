//! # Core Domain Entities
//!
//! Defines the canvas entities shared by the server subsystems and clients.
//!
//! ## Clusters
//!
//! - **Grid**: `Coord`, `CanvasDimensions`, `Color`, `Cell`, `CanvasSnapshot`
//! - **Identity & Payment**: `Identity`, `TransactionId`, `WriteId`, `PaymentState`
//! - **Time**: `Timestamp`, `TimeSource`

use crate::errors::TypeError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Milliseconds since the Unix epoch.
pub type Timestamp = u64;

/// Server-wide commit sequence number. Zero means "never written".
pub type Revision = u64;

// =============================================================================
// CLUSTER A: THE GRID
// =============================================================================

/// A cell coordinate on the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coord {
    pub x: u32,
    pub y: u32,
}

impl Coord {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// The `"x,y"` key used by the compact canvas representation.
    pub fn key(&self) -> String {
        format!("{},{}", self.x, self.y)
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Grid bounds. Valid coordinates satisfy `x < width && y < height`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasDimensions {
    pub width: u32,
    pub height: u32,
}

impl CanvasDimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn contains(&self, coord: Coord) -> bool {
        coord.x < self.width && coord.y < self.height
    }

    /// Row-major slot index, or `None` when out of bounds.
    pub fn index_of(&self, coord: Coord) -> Option<usize> {
        if !self.contains(coord) {
            return None;
        }
        Some(coord.y as usize * self.width as usize + coord.x as usize)
    }

    pub fn cell_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

impl Default for CanvasDimensions {
    fn default() -> Self {
        Self::new(1000, 1000)
    }
}

/// A 24-bit RGB color, serialized as `#RRGGBB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color(u32);

impl Color {
    pub const WHITE: Color = Color(0xFF_FF_FF);

    pub fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Color(((r as u32) << 16) | ((g as u32) << 8) | b as u32)
    }

    /// Parse `#RRGGBB` (case-insensitive).
    pub fn parse(raw: &str) -> Result<Self, TypeError> {
        let hex = raw
            .trim()
            .strip_prefix('#')
            .ok_or_else(|| TypeError::InvalidColor(raw.to_string()))?;
        if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(TypeError::InvalidColor(raw.to_string()));
        }
        u32::from_str_radix(hex, 16)
            .map(Color)
            .map_err(|_| TypeError::InvalidColor(raw.to_string()))
    }

    pub fn rgb(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:06X}", self.0)
    }
}

impl TryFrom<String> for Color {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Color::parse(&value)
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

/// A committed cell. Last writer wins; cells are never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub x: u32,
    pub y: u32,
    pub color: Color,
    pub owner: Identity,
    pub written_at: Timestamp,
    pub revision: Revision,
    /// Idempotency key of the write that produced this cell.
    pub write_id: WriteId,
}

impl Cell {
    pub fn coord(&self) -> Coord {
        Coord::new(self.x, self.y)
    }
}

/// Full authoritative view at a revision.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasSnapshot {
    /// Highest revision included in `cells`.
    pub revision: Revision,
    pub cells: Vec<Cell>,
}

// =============================================================================
// CLUSTER B: IDENTITY & PAYMENT
// =============================================================================

/// Opaque wallet address. Join key between ledger, writes and payments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identity(String);

impl Identity {
    pub fn new(raw: impl Into<String>) -> Result<Self, TypeError> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(TypeError::EmptyIdentity);
        }
        Ok(Identity(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Identity {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Identity::new(value)
    }
}

impl From<Identity> for String {
    fn from(id: Identity) -> Self {
        id.0
    }
}

/// On-chain payment transaction id.
///
/// Wallets hand ids back in several shapes, so construction normalizes:
/// surrounding whitespace and quotes are stripped, and a JSON object is
/// unwrapped through its `id` or `transactionId` field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TransactionId(String);

impl TransactionId {
    pub fn parse(raw: &str) -> Result<Self, TypeError> {
        let stripped = raw.trim().trim_matches(|c| c == '"' || c == '\'').trim();

        let normalized = if stripped.starts_with('{') && stripped.ends_with('}') {
            match serde_json::from_str::<serde_json::Value>(stripped) {
                Ok(value) => value
                    .get("id")
                    .or_else(|| value.get("transactionId"))
                    .and_then(|v| v.as_str())
                    .map(str::to_string)
                    .unwrap_or_else(|| stripped.to_string()),
                Err(_) => stripped.to_string(),
            }
        } else {
            stripped.to_string()
        };

        if normalized.is_empty() {
            return Err(TypeError::EmptyTransactionId);
        }
        Ok(TransactionId(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for TransactionId {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        TransactionId::parse(&value)
    }
}

impl From<TransactionId> for String {
    fn from(id: TransactionId) -> Self {
        id.0
    }
}

/// Idempotency key of a single write request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WriteId(String);

impl WriteId {
    pub fn new(raw: impl Into<String>) -> Result<Self, TypeError> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(TypeError::EmptyWriteId);
        }
        Ok(WriteId(raw))
    }

    /// Fresh random id for a client-originated write.
    pub fn generate() -> Self {
        WriteId(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WriteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for WriteId {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        WriteId::new(value)
    }
}

impl From<WriteId> for String {
    fn from(id: WriteId) -> Self {
        id.0
    }
}

/// Lifecycle of a pending payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentState {
    Submitted,
    Polling,
    Confirmed,
    TimedOut,
    Failed,
}

impl PaymentState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PaymentState::Confirmed | PaymentState::TimedOut | PaymentState::Failed
        )
    }
}

impl fmt::Display for PaymentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PaymentState::Submitted => "submitted",
            PaymentState::Polling => "polling",
            PaymentState::Confirmed => "confirmed",
            PaymentState::TimedOut => "timed_out",
            PaymentState::Failed => "failed",
        };
        f.write_str(s)
    }
}

// =============================================================================
// CLUSTER C: TIME
// =============================================================================

/// Abstract clock (for testability).
pub trait TimeSource: Send + Sync {
    /// Current time in milliseconds since epoch.
    fn now(&self) -> Timestamp;
}

/// Default time source using system time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> Timestamp {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}
