//! # pc-client
//!
//! Command-line front end for a Pixel Canvas server, built on the
//! `pc-04-client-sync` engine.
//!
//! ```text
//! pc-client --wallet kaspa:qr... watch
//! pc-client --wallet kaspa:qr... place 10 20 '#FF0000'
//! pc-client --wallet kaspa:qr... buy <transaction-id>
//! ```

pub mod cli;
pub mod render;

pub use cli::{Cli, Command};
