//! # Event Subscriber
//!
//! Defines the subscription side of the event bus.

use crate::events::{CanvasEvent, EventFilter};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::debug;

/// Errors from subscription operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The event bus was closed.
    #[error("Event bus closed")]
    Closed,

    /// The subscriber fell behind and `skipped` events were dropped.
    /// The stream continues with the oldest retained event.
    #[error("Subscriber lagged, {skipped} events dropped")]
    Lagged { skipped: u64 },
}

/// One subscriber's view of the bus: its own bounded ring plus a topic
/// filter. Dropping it releases the ring.
pub struct Subscription {
    receiver: broadcast::Receiver<CanvasEvent>,
    filter: EventFilter,
}

impl Subscription {
    pub(crate) fn new(receiver: broadcast::Receiver<CanvasEvent>, filter: EventFilter) -> Self {
        Self { receiver, filter }
    }

    /// Receive the next event that matches the filter.
    ///
    /// A `Lagged` error is reported once per overflow; calling `recv` again
    /// resumes with the oldest event still buffered.
    pub async fn recv(&mut self) -> Result<CanvasEvent, SubscriptionError> {
        loop {
            let event = match self.receiver.recv().await {
                Ok(e) => e,
                Err(broadcast::error::RecvError::Closed) => return Err(SubscriptionError::Closed),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "Subscriber lagged, oldest events dropped");
                    return Err(SubscriptionError::Lagged { skipped });
                }
            };

            if self.filter.matches(&event) {
                return Ok(event);
            }
        }
    }

    /// Try to receive the next event without blocking.
    ///
    /// - `Ok(Some(event))` - An event was available and matched
    /// - `Ok(None)` - No event available (would block)
    /// - `Err(_)` - The channel was closed or the subscriber lagged
    pub fn try_recv(&mut self) -> Result<Option<CanvasEvent>, SubscriptionError> {
        loop {
            let event = match self.receiver.try_recv() {
                Ok(e) => e,
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Closed) => {
                    return Err(SubscriptionError::Closed)
                }
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    return Err(SubscriptionError::Lagged { skipped })
                }
            };

            if self.filter.matches(&event) {
                return Ok(Some(event));
            }
        }
    }

    /// Drop everything buffered so far. Used after resynchronizing from a
    /// snapshot that already covers those events.
    pub fn drain(&mut self) {
        self.receiver = self.receiver.resubscribe();
    }

    /// Get the filter for this subscription.
    #[must_use]
    pub fn filter(&self) -> &EventFilter {
        &self.filter
    }
}
