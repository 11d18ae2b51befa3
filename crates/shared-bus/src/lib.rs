//! # Shared Bus - In-Process Event Bus
//!
//! Carries committed cells and payment outcomes from the subsystems that
//! produce them to whoever listens (the WebSocket fan-out, metrics, tests).
//!
//! ```text
//! ┌──────────────┐                    ┌──────────────┐
//! │ Canvas Store │                    │  WS Fan-out  │
//! │              │    publish()       │              │
//! │              │ ──────┐            │              │
//! └──────────────┘       │            └──────────────┘
//!                        ▼                    ↑
//!                  ┌──────────────┐          │
//!                  │  Event Bus   │          │
//!                  │              │ ─────────┘
//!                  └──────────────┘  subscribe()
//! ```
//!
//! ## Delivery
//!
//! - The publisher never blocks on subscribers.
//! - Each subscriber owns a bounded ring buffer. When it falls behind, the
//!   oldest entries are dropped and its next `recv` reports
//!   [`SubscriptionError::Lagged`] so the consumer can resynchronize from a
//!   snapshot.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod events;
pub mod publisher;
pub mod subscriber;

pub use events::{CanvasEvent, EventFilter, EventTopic};
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use subscriber::{Subscription, SubscriptionError};

/// Events buffered per subscriber before the oldest are dropped.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;
