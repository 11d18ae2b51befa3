//! # Adapter Implementations
//!
//! Concrete adapters that implement each subsystem's **outbound ports** with
//! another subsystem's inbound API:
//!
//! ```text
//! ┌──────────────────┐   CellCommitter   ┌──────────────────┐
//! │ pc-02 admission  │ ────────────────→ │ pc-01 canvas     │
//! └──────────────────┘                   └──────────────────┘
//!          ↑ CreditSink                           ↑ CanvasReader
//! ┌──────────────────┐                   ┌──────────────────┐
//! │ pc-03 payments   │                   │ pc-05 gateway    │
//! └──────────────────┘                   └──────────────────┘
//! ```
//!
//! plus the storage backend shared by the canvas and the ledger.

pub mod canvas;
pub mod ledger;
pub mod storage;

pub use canvas::CanvasStoreAdapter;
pub use ledger::LedgerCreditSink;
pub use storage::NodeStore;
