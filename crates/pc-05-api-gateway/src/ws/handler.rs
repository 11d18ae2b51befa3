//! Broadcast stream at `/ws`.
//!
//! Per connection:
//! - subscribe to canvas events first, then send a snapshot, so no commit
//!   falls between the two (a delta the snapshot already covers is dropped by
//!   the client on revision)
//! - forward every committed cell as a delta
//! - a subscriber that lags past its ring is resynchronized with a fresh
//!   snapshot
//! - answer `ping` with `pong`, ping a client that has been silent for the
//!   ping interval and close it after the idle timeout

use crate::error::SUBSYSTEM;
use crate::router::GatewayState;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use canvas_telemetry::{BROADCAST_RESYNCS, BROADCAST_SUBSCRIBERS};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use shared_bus::{CanvasEvent, EventFilter, EventTopic, SubscriptionError};
use shared_types::StreamMessage;
use tokio::time::Instant;
use tracing::{debug, info, warn};

pub async fn stream_upgrade(ws: WebSocketUpgrade, State(state): State<GatewayState>) -> Response {
    ws.on_upgrade(move |socket| serve_stream(socket, state))
}

/// Keeps the subscriber gauge accurate however the connection ends.
struct SubscriberGauge;

impl SubscriberGauge {
    fn register() -> Self {
        BROADCAST_SUBSCRIBERS.inc();
        Self
    }
}

impl Drop for SubscriberGauge {
    fn drop(&mut self) {
        BROADCAST_SUBSCRIBERS.dec();
    }
}

type Sink = SplitSink<WebSocket, Message>;

async fn send_frame(sink: &mut Sink, message: &StreamMessage) -> bool {
    let text = match message.to_json() {
        Ok(text) => text,
        Err(e) => {
            warn!(subsystem = SUBSYSTEM, error = %e, "Failed to encode stream frame");
            return true;
        }
    };
    sink.send(Message::Text(text)).await.is_ok()
}

async fn send_snapshot(sink: &mut Sink, state: &GatewayState) -> bool {
    send_frame(sink, &StreamMessage::Snapshot(state.canvas.snapshot())).await
}

pub async fn serve_stream(socket: WebSocket, state: GatewayState) {
    let _gauge = SubscriberGauge::register();
    let mut subscription = state
        .bus
        .subscribe(EventFilter::topics(vec![EventTopic::Canvas]));
    let (mut sink, mut stream) = socket.split();
    let settings = state.stream;

    if !send_snapshot(&mut sink, &state).await {
        return;
    }
    debug!(subsystem = SUBSYSTEM, "Stream client connected");

    let mut last_inbound = Instant::now();
    let mut last_ping = last_inbound;

    loop {
        let ping_at = last_inbound.max(last_ping) + settings.ping_interval;
        let idle_at = last_inbound + settings.idle_timeout;

        tokio::select! {
            biased;
            _ = state.shutdown.cancelled() => {
                let _ = sink.send(Message::Close(None)).await;
                break;
            }
            event = subscription.recv() => match event {
                Ok(CanvasEvent::CellCommitted(cell)) => {
                    if !send_frame(&mut sink, &StreamMessage::Delta(cell)).await {
                        break;
                    }
                }
                Ok(_) => {}
                Err(SubscriptionError::Lagged { skipped }) => {
                    // Drop the stale ring before snapshotting so nothing
                    // after the snapshot is lost.
                    subscription.drain();
                    BROADCAST_RESYNCS.inc();
                    info!(subsystem = SUBSYSTEM, skipped, "Stream client lagged, resyncing");
                    if !send_snapshot(&mut sink, &state).await {
                        break;
                    }
                }
                Err(SubscriptionError::Closed) => break,
            },
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    last_inbound = Instant::now();
                    if let Ok(StreamMessage::Ping) = StreamMessage::from_json(&text) {
                        if !send_frame(&mut sink, &StreamMessage::Pong).await {
                            break;
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => last_inbound = Instant::now(),
                Some(Err(e)) => {
                    debug!(subsystem = SUBSYSTEM, error = %e, "Stream read failed");
                    break;
                }
            },
            _ = tokio::time::sleep_until(idle_at) => {
                info!(subsystem = SUBSYSTEM, "Closing silent stream client");
                let _ = sink.send(Message::Close(None)).await;
                break;
            }
            _ = tokio::time::sleep_until(ping_at) => {
                last_ping = Instant::now();
                if !send_frame(&mut sink, &StreamMessage::Ping).await {
                    break;
                }
            }
        }
    }

    debug!(subsystem = SUBSYSTEM, "Stream client disconnected");
}
