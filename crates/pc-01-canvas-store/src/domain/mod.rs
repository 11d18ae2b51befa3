//! Domain layer for the canvas store

pub mod config;
pub mod grid;
pub mod record;

pub use config::CanvasConfig;
pub use grid::StripedGrid;
