//! WebSocket broadcast stream

pub mod handler;

pub use handler::{serve_stream, stream_upgrade};
