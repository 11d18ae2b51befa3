//! # Node Runtime Library
//!
//! This library exposes the internal modules of the node runtime for testing.
//! The main entry point is the `main.rs` binary.
//!
//! ## Modular Structure
//!
//! - `container/` - Configuration and the subsystem container
//! - `adapters/` - Port implementations connecting subsystems, storage backends
//! - `runtime` - Startup, serving and graceful shutdown
//!
//! ## Architectural Patterns
//!
//! - **Hexagonal Architecture**: Ports define contracts, Adapters implement them
//! - **EDA**: Commits, credits and settled payments are published on the event
//!   bus; the gateway fans canvas events out to stream clients

pub mod adapters;
pub mod container;
pub mod error;
pub mod runtime;

pub use container::{NodeConfig, StartupReport, SubsystemContainer};
pub use error::{NodeError, NodeResult};
pub use runtime::NodeRuntime;
