//! Broadcast stream client
//!
//! Holds a WebSocket to the server's `/ws` endpoint, reconnecting with
//! exponential backoff. Each connection sends heartbeat pings, answers the
//! server's pings, and is dropped when the server goes silent for longer than
//! `silence_timeout`. The server opens every connection with a snapshot, so
//! a reconnect is also a resync.

use crate::domain::ClientTimingConfig;
use futures::{SinkExt, StreamExt};
use shared_types::StreamMessage;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// What the broadcast client reports to the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Connected,
    Message(StreamMessage),
    Disconnected { reason: String },
}

/// How one connection ended.
enum Session {
    /// Shutdown requested or nobody is listening any more.
    Stopped,
    /// Connection lost after it was established.
    Dropped(String),
}

pub struct BroadcastClient {
    url: String,
    timing: ClientTimingConfig,
}

impl BroadcastClient {
    pub fn new(url: impl Into<String>, timing: ClientTimingConfig) -> Self {
        Self {
            url: url.into(),
            timing,
        }
    }

    /// Keep a connection open until `cancel` fires.
    pub async fn run(self, cancel: CancellationToken, events: mpsc::Sender<StreamEvent>) {
        let mut delay = self.timing.reconnect_initial;

        loop {
            if cancel.is_cancelled() {
                break;
            }

            let reason = match self.run_connection(&cancel, &events).await {
                Ok(Session::Stopped) => break,
                Ok(Session::Dropped(reason)) => {
                    delay = self.timing.reconnect_initial;
                    reason
                }
                Err(reason) => reason,
            };

            warn!(url = %self.url, reason = %reason, retry_in = ?delay, "Broadcast stream lost");
            if events
                .send(StreamEvent::Disconnected { reason })
                .await
                .is_err()
            {
                break;
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
            delay = next_delay(delay, self.timing.reconnect_max);
        }

        debug!(url = %self.url, "Broadcast client stopped");
    }

    /// One connection from handshake to close.
    async fn run_connection(
        &self,
        cancel: &CancellationToken,
        events: &mpsc::Sender<StreamEvent>,
    ) -> Result<Session, String> {
        let connect = tokio::select! {
            _ = cancel.cancelled() => return Ok(Session::Stopped),
            result = connect_async(self.url.as_str()) => result,
        };
        let (ws_stream, _) = connect.map_err(|e| format!("connect failed: {e}"))?;
        info!(url = %self.url, "Broadcast stream connected");

        if events.send(StreamEvent::Connected).await.is_err() {
            return Ok(Session::Stopped);
        }

        let (mut write, mut read) = ws_stream.split();
        let ping = StreamMessage::Ping
            .to_json()
            .map_err(|e| format!("encode ping: {e}"))?;
        let pong = StreamMessage::Pong
            .to_json()
            .map_err(|e| format!("encode pong: {e}"))?;

        let mut heartbeat = tokio::time::interval_at(
            Instant::now() + self.timing.heartbeat_interval,
            self.timing.heartbeat_interval,
        );
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_seen = Instant::now();

        loop {
            let silent_at = last_seen + self.timing.silence_timeout;

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    let _ = write.send(Message::Close(None)).await;
                    return Ok(Session::Stopped);
                }
                _ = tokio::time::sleep_until(silent_at) => {
                    return Ok(Session::Dropped(format!(
                        "server silent for {:?}",
                        self.timing.silence_timeout
                    )));
                }
                _ = heartbeat.tick() => {
                    if let Err(e) = write.send(Message::Text(ping.clone().into())).await {
                        return Ok(Session::Dropped(format!("heartbeat failed: {e}")));
                    }
                }
                frame = read.next() => {
                    last_seen = Instant::now();
                    match frame {
                        Some(Ok(Message::Text(text))) => match StreamMessage::from_json(&text) {
                            Ok(StreamMessage::Ping) => {
                                if let Err(e) = write.send(Message::Text(pong.clone().into())).await {
                                    return Ok(Session::Dropped(format!("pong failed: {e}")));
                                }
                            }
                            Ok(StreamMessage::Pong) => {}
                            Ok(message) => {
                                if events.send(StreamEvent::Message(message)).await.is_err() {
                                    return Ok(Session::Stopped);
                                }
                            }
                            Err(e) => warn!(error = %e, "Undecodable broadcast frame"),
                        },
                        Some(Ok(Message::Ping(data))) => {
                            let _ = write.send(Message::Pong(data)).await;
                        }
                        Some(Ok(Message::Close(_))) => {
                            return Ok(Session::Dropped("closed by server".into()));
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => return Ok(Session::Dropped(e.to_string())),
                        None => return Ok(Session::Dropped("stream ended".into())),
                    }
                }
            }
        }
    }
}

fn next_delay(current: Duration, max: Duration) -> Duration {
    current.saturating_mul(2).min(max)
}
