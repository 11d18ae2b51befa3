//! Client Reconciliation Engine - Core logic
//!
//! Owns one client's optimistic view and keeps it converging on the server:
//! - local writes show immediately and roll back on refusal
//! - broadcast deltas and snapshots feed the authoritative tier
//! - a purchase runs three cancelable loops: an elapsed-time ticker, a mirror
//!   of the server's verification state, and balance reconciliation
//!
//! Every loop holds a child of the engine's shutdown token and checks it
//! before each tick and again after each await, so nothing fires after
//! cancellation.

use crate::adapters::broadcast::StreamEvent;
use crate::domain::{
    BalanceSettlement, BalanceWatch, ClientTimingConfig, LocalCanvas, LocalCreditEstimate,
    MergeOutcome, WatchStep, WatchStop,
};
use crate::error::{ClientError, ClientResult};
use crate::ports::inbound::ClientEvent;
use crate::ports::outbound::CanvasApi;
use parking_lot::Mutex;
use shared_types::{
    CanvasDimensions, Color, Coord, Identity, PaymentState, PlacePixelRequest,
    PlacePixelResponse, PurchaseRequest, PurchaseResponse, StreamMessage, TransactionId,
    VerifyResponse, WriteId,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

struct EngineState {
    canvas: LocalCanvas,
    credit: LocalCreditEstimate,
}

/// Everything a background loop needs, cloned out of the engine.
struct LoopContext<A> {
    api: Arc<A>,
    identity: Identity,
    timing: ClientTimingConfig,
    state: Arc<Mutex<EngineState>>,
    events: mpsc::UnboundedSender<ClientEvent>,
}

impl<A> Clone for LoopContext<A> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            identity: self.identity.clone(),
            timing: self.timing.clone(),
            state: Arc::clone(&self.state),
            events: self.events.clone(),
        }
    }
}

impl<A> LoopContext<A> {
    fn emit(&self, event: ClientEvent) {
        // The host may have stopped listening; the engine keeps working.
        let _ = self.events.send(event);
    }
}

/// Final result of a purchase follow-up.
#[derive(Debug, Clone, PartialEq)]
pub struct PurchaseOutcome {
    pub verification: VerifyResponse,
    pub balance: BalanceSettlement,
}

/// Handle on a running purchase follow-up.
pub struct PurchaseSession {
    pub transaction_id: TransactionId,
    pub response: PurchaseResponse,
    cancel: CancellationToken,
    handle: JoinHandle<ClientResult<PurchaseOutcome>>,
}

impl PurchaseSession {
    /// Stop every loop of this purchase.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub async fn outcome(self) -> ClientResult<PurchaseOutcome> {
        self.handle
            .await
            .map_err(|e| ClientError::Transport(format!("follow-up task failed: {e}")))?
    }
}

pub struct ClientEngine<A: CanvasApi> {
    ctx: LoopContext<A>,
    shutdown: CancellationToken,
}

impl<A: CanvasApi + 'static> ClientEngine<A> {
    pub fn new(
        api: Arc<A>,
        identity: Identity,
        dimensions: CanvasDimensions,
        timing: ClientTimingConfig,
    ) -> (Self, mpsc::UnboundedReceiver<ClientEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let engine = Self {
            ctx: LoopContext {
                api,
                identity,
                timing,
                state: Arc::new(Mutex::new(EngineState {
                    canvas: LocalCanvas::new(dimensions),
                    credit: LocalCreditEstimate::default(),
                })),
                events,
            },
            shutdown: CancellationToken::new(),
        };
        (engine, rx)
    }

    pub fn identity(&self) -> &Identity {
        &self.ctx.identity
    }

    /// Token cancelled on teardown; adapters like the broadcast client share it.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Stop every loop.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    pub fn view(&self, coord: Coord) -> Option<Color> {
        self.ctx.state.lock().canvas.view(coord)
    }

    pub fn visible(&self) -> BTreeMap<Coord, Color> {
        self.ctx.state.lock().canvas.visible()
    }

    pub fn revision(&self) -> u64 {
        self.ctx.state.lock().canvas.revision()
    }

    pub fn pending_writes(&self) -> usize {
        self.ctx.state.lock().canvas.pending_count()
    }

    pub fn available_credit(&self) -> u64 {
        self.ctx.state.lock().credit.available()
    }

    /// Pull a full snapshot and the current balance over HTTP.
    pub async fn sync(&self) -> ClientResult<()> {
        let snapshot = self.ctx.api.snapshot().await?;
        let balance = self.ctx.api.balance(&self.ctx.identity).await?;

        let (revision, cells) = (snapshot.revision, snapshot.cells.len());
        {
            let mut state = self.ctx.state.lock();
            state.canvas.apply_snapshot(snapshot);
            state.credit.observe(balance);
        }
        self.ctx
            .emit(ClientEvent::SnapshotApplied { revision, cells });
        Ok(())
    }

    /// Merge one broadcast frame.
    pub fn ingest(&self, message: StreamMessage) {
        match message {
            StreamMessage::Snapshot(snapshot) => {
                let (revision, cells) = (snapshot.revision, snapshot.cells.len());
                self.ctx.state.lock().canvas.apply_snapshot(snapshot);
                debug!(revision, cells, "Snapshot applied");
                self.ctx
                    .emit(ClientEvent::SnapshotApplied { revision, cells });
            }
            StreamMessage::Delta(cell) => {
                let coord = cell.coord();
                let revision = cell.revision;
                let visible = {
                    let mut state = self.ctx.state.lock();
                    match state.canvas.merge_delta(cell) {
                        MergeOutcome::Applied => Some(state.canvas.view(coord)),
                        MergeOutcome::Duplicate | MergeOutcome::Stale => None,
                    }
                };
                match visible {
                    Some(color) => self.ctx.emit(ClientEvent::CellChanged { coord, color }),
                    None => debug!(x = coord.x, y = coord.y, revision, "Delta ignored"),
                }
            }
            StreamMessage::Ping | StreamMessage::Pong => {}
        }
    }

    /// Handle an event from the broadcast client.
    pub fn on_stream_event(&self, event: StreamEvent) {
        match event {
            StreamEvent::Connected => self.ctx.emit(ClientEvent::StreamConnected),
            StreamEvent::Message(message) => self.ingest(message),
            StreamEvent::Disconnected { reason } => {
                self.ctx
                    .emit(ClientEvent::StreamDisconnected { reason })
            }
        }
    }

    /// Write a cell: show it now, submit it, roll back on refusal.
    pub async fn place(&self, coord: Coord, color: Color) -> ClientResult<PlacePixelResponse> {
        let ctx = &self.ctx;
        let write_id = WriteId::generate();

        {
            let mut state = ctx.state.lock();
            if !state.canvas.apply_local(write_id.clone(), coord, color) {
                return Err(ClientError::OutOfBounds {
                    x: coord.x,
                    y: coord.y,
                });
            }
            state.credit.reserve();
        }
        ctx.emit(ClientEvent::CellChanged {
            coord,
            color: Some(color),
        });

        let request = PlacePixelRequest {
            x: coord.x,
            y: coord.y,
            color: color.to_string(),
            wallet_address: ctx.identity.to_string(),
            transaction_id: write_id.to_string(),
        };

        match ctx.api.place(request).await {
            Ok(response) => {
                let mut state = ctx.state.lock();
                state
                    .canvas
                    .acknowledge(&write_id, response.pixel.clone());
                state.credit.settle(response.remaining_balance);
                Ok(response)
            }
            Err(err) => {
                let visible = {
                    let mut state = ctx.state.lock();
                    state.credit.release();
                    state.canvas.rollback(&write_id)
                };
                if let Some(color) = visible {
                    ctx.emit(ClientEvent::CellChanged { coord, color });
                }
                ctx.emit(ClientEvent::WriteRolledBack {
                    write_id,
                    reason: err.to_string(),
                });

                if let ClientError::InsufficientCredit { balance } = err {
                    let balance = ctx.api.balance(&ctx.identity).await.unwrap_or(balance);
                    ctx.state.lock().credit.observe(balance);
                    ctx.emit(ClientEvent::OutOfCredit { balance });
                    return Err(ClientError::InsufficientCredit { balance });
                }
                Err(err)
            }
        }
    }

    /// Submit a payment and start its follow-up loops.
    pub async fn purchase(
        &self,
        transaction_id: TransactionId,
        amount_sompi: u64,
    ) -> ClientResult<PurchaseSession> {
        let ctx = self.ctx.clone();
        let prior = ctx.api.balance(&ctx.identity).await?;
        ctx.state.lock().credit.observe(prior);

        let response = ctx
            .api
            .purchase(PurchaseRequest {
                wallet_address: ctx.identity.to_string(),
                transaction_id: transaction_id.to_string(),
                amount_sompi,
            })
            .await?;
        info!(
            tx_id = %transaction_id,
            status = ?response.status,
            estimated = response.estimated_pixels,
            "Payment submitted"
        );

        let cancel = self.shutdown.child_token();
        let handle = tokio::spawn(follow_up(
            ctx,
            transaction_id.clone(),
            prior,
            response.estimated_pixels,
            cancel.clone(),
        ));

        Ok(PurchaseSession {
            transaction_id,
            response,
            cancel,
            handle,
        })
    }
}

/// Ticker and verification mirror, then balance reconciliation.
async fn follow_up<A: CanvasApi + 'static>(
    ctx: LoopContext<A>,
    transaction_id: TransactionId,
    prior: u64,
    expected: u64,
    cancel: CancellationToken,
) -> ClientResult<PurchaseOutcome> {
    let ticker = cancel.child_token();
    tokio::spawn(elapsed_ticker(
        ctx.clone(),
        transaction_id.clone(),
        ticker.clone(),
    ));

    let verification = mirror_verification(&ctx, &transaction_id, &cancel).await;
    ticker.cancel();
    let verification = verification?;

    match verification.state {
        PaymentState::Confirmed => {}
        PaymentState::TimedOut => return Err(ClientError::VerificationTimedOut(transaction_id)),
        _ => {
            return Err(ClientError::PaymentFailed {
                transaction_id,
                reason: verification
                    .error
                    .clone()
                    .unwrap_or_else(|| verification.message.clone()),
            })
        }
    }

    let balance = reconcile_balance(&ctx, prior, expected, &cancel).await;
    Ok(PurchaseOutcome {
        verification,
        balance,
    })
}

/// Report elapsed time since submission until cancelled.
async fn elapsed_ticker<A>(
    ctx: LoopContext<A>,
    transaction_id: TransactionId,
    cancel: CancellationToken,
) {
    let started = Instant::now();
    let mut ticker = tokio::time::interval(ctx.timing.ticker_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            _ = ticker.tick() => {}
        }
        if cancel.is_cancelled() {
            return;
        }
        ctx.emit(ClientEvent::VerificationTick {
            transaction_id: transaction_id.clone(),
            elapsed: started.elapsed(),
        });
    }
}

/// Poll the server's verification state until it is terminal.
///
/// Failed polls are retried. The mirror gives up a few polls after the
/// server's own window would have closed.
async fn mirror_verification<A: CanvasApi>(
    ctx: &LoopContext<A>,
    transaction_id: &TransactionId,
    cancel: &CancellationToken,
) -> ClientResult<VerifyResponse> {
    let started = Instant::now();
    let give_up = ctx.timing.verification_timeout + ctx.timing.transaction_check_interval * 4;
    let mut ticker = tokio::time::interval(ctx.timing.transaction_check_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last_state = None;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ClientError::Cancelled),
            _ = ticker.tick() => {}
        }
        if cancel.is_cancelled() {
            return Err(ClientError::Cancelled);
        }

        let polled = ctx.api.verify(transaction_id).await;
        if cancel.is_cancelled() {
            return Err(ClientError::Cancelled);
        }

        match polled {
            Ok(response) => {
                if last_state != Some(response.state) {
                    last_state = Some(response.state);
                    ctx.emit(ClientEvent::VerificationState {
                        transaction_id: transaction_id.clone(),
                        state: response.state,
                    });
                }
                if response.state.is_terminal() {
                    return Ok(response);
                }
            }
            Err(e) => debug!(tx_id = %transaction_id, error = %e, "Verification poll failed, retrying"),
        }

        if started.elapsed() >= give_up {
            warn!(tx_id = %transaction_id, "Verification mirror gave up");
            return Err(ClientError::VerificationTimedOut(transaction_id.clone()));
        }
    }
}

/// Poll the balance until the credit shows up or the watch stops.
async fn reconcile_balance<A: CanvasApi>(
    ctx: &LoopContext<A>,
    prior: u64,
    expected: u64,
    cancel: &CancellationToken,
) -> BalanceSettlement {
    let started = Instant::now();
    let mut watch = BalanceWatch::new(
        prior,
        expected,
        ctx.timing.balance_max_wait,
        ctx.timing.balance_anomaly_threshold,
    );
    let mut ticker = tokio::time::interval(ctx.timing.balance_poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let settlement = loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break watch.settle(WatchStop::Cancelled),
            _ = ticker.tick() => {}
        }
        if cancel.is_cancelled() {
            break watch.settle(WatchStop::Cancelled);
        }

        let reading = ctx.api.balance(&ctx.identity).await;
        if cancel.is_cancelled() {
            break watch.settle(WatchStop::Cancelled);
        }

        let step = match reading {
            Ok(balance) => {
                ctx.state.lock().credit.observe(balance);
                watch.observe(balance, started.elapsed())
            }
            Err(e) => {
                debug!(error = %e, "Balance poll failed");
                if started.elapsed() >= ctx.timing.balance_max_wait {
                    WatchStep::Stop(WatchStop::Expired)
                } else {
                    WatchStep::Continue
                }
            }
        };

        if let WatchStep::Stop(reason) = step {
            break watch.settle(reason);
        }
    };

    if settlement.reason != WatchStop::Reached {
        info!(
            balance = settlement.balance,
            target = watch.target(),
            reason = ?settlement.reason,
            "Balance reconciliation stopped short of target"
        );
    }
    ctx.emit(ClientEvent::BalanceSettled(settlement));
    settlement
}
