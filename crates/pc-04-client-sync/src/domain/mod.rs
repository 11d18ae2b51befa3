//! Domain layer for the client engine

pub mod balance_watch;
pub mod config;
pub mod credit;
pub mod local_canvas;

pub use balance_watch::{BalanceSettlement, BalanceWatch, WatchStep, WatchStop};
pub use config::ClientTimingConfig;
pub use credit::LocalCreditEstimate;
pub use local_canvas::{LocalCanvas, MergeOutcome};
