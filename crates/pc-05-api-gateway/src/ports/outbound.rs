//! Driven Ports (SPI - Outbound Dependencies)
//!
//! The write path and payments go through the pc-02 and pc-03 inbound
//! traits. Reads of the canvas go through [`CanvasReader`].
//!
//! Production adapter: `CanvasReaderAdapter` in node-runtime over
//! `pc-01-canvas-store`.

use shared_types::{CanvasDimensions, CanvasSnapshot};

pub use pc_02_credit_ledger::{AdmissionApi, CreditLedgerApi};
pub use pc_03_payment_verification::VerificationApi;

/// Read-only view of the canonical canvas.
pub trait CanvasReader: Send + Sync {
    fn snapshot(&self) -> CanvasSnapshot;

    fn dimensions(&self) -> CanvasDimensions;
}
