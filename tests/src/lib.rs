//! # Pixel Canvas Test Suite
//!
//! Unified test crate containing:
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── fixtures.rs       # Scripted oracle, in-process node
//! └── integration/
//!     ├── scenarios.rs  # Ledger, admission and verification wired together
//!     └── client_flows.rs # Client engines against a running node
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p pc-tests
//!
//! # By category
//! cargo test -p pc-tests integration::scenarios
//! cargo test -p pc-tests integration::client_flows
//!
//! # Benchmarks
//! cargo bench -p pc-tests
//! ```

pub mod fixtures;
pub mod integration;
