//! Payment Verification Service - Core business logic
//!
//! One tokio task per in-flight transaction id. Each task owns a
//! cancellation token (a child of the service's shutdown token) and checks it
//! before every poll and again before acting on the poll's result, so a
//! cancelled or already settled payment never produces a late side effect.
//!
//! Crediting happens only on the single transition into `Confirmed`; the
//! ledger's own idempotency by transaction id backs this up across
//! resubmissions and restarts.
//!
//! Each payment is written under `payment:{id}` when it is submitted and
//! when it settles. A payment still polling when the node stopped is
//! reloaded as TimedOut.

use crate::domain::{
    decode_payment, encode_payment, payment_key, Confirmation, ConfirmationStats, PaymentEvent,
    PendingPayment, PricingConfig, Transition, VerificationConfig, PAYMENT_PREFIX,
};
use crate::error::{CreditSinkError, VerificationError, VerificationResult};
use crate::ports::inbound::{PaymentRequest, SubmitOutcome, VerificationApi};
use crate::ports::outbound::{
    CreditReceipt, CreditSink, EventPublisher, FinalityOracle, KeyValueStore, OracleStatus,
    TimeSource,
};
use async_trait::async_trait;
use canvas_telemetry::{
    log_tx_event, CONFIRMATION_SECONDS, ORACLE_ERRORS, PAYMENTS_IN_FLIGHT, PAYMENTS_SETTLED,
};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use shared_bus::CanvasEvent;
use shared_types::{MetricsSummary, PaymentState, TransactionId, TransactionMetrics};
use std::sync::Arc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

const SUBSYSTEM: &str = "pc-03";

/// Summary of a startup reload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PaymentLoadReport {
    pub payments: usize,
    /// Still polling when the node stopped; reloaded as TimedOut.
    pub interrupted: usize,
}

struct TrackedPayment {
    payment: PendingPayment,
    cancel: CancellationToken,
    started: Instant,
}

struct Shared<O, S, P, K> {
    config: VerificationConfig,
    pricing: PricingConfig,
    oracle: Arc<O>,
    sink: Arc<S>,
    publisher: Arc<P>,
    store: Arc<K>,
    clock: Arc<dyn TimeSource>,
    payments: DashMap<TransactionId, TrackedPayment>,
    stats: Mutex<ConfirmationStats>,
    shutdown: CancellationToken,
}

/// Payment verification implementation
///
/// Cheap to clone; clones share the same registry and tasks.
pub struct VerificationService<O, S, P, K>
where
    O: FinalityOracle,
    S: CreditSink,
    P: EventPublisher,
    K: KeyValueStore,
{
    shared: Arc<Shared<O, S, P, K>>,
}

impl<O, S, P, K> Clone for VerificationService<O, S, P, K>
where
    O: FinalityOracle,
    S: CreditSink,
    P: EventPublisher,
    K: KeyValueStore,
{
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<O, S, P, K> VerificationService<O, S, P, K>
where
    O: FinalityOracle + 'static,
    S: CreditSink + 'static,
    P: EventPublisher + 'static,
    K: KeyValueStore + 'static,
{
    pub fn new(
        config: VerificationConfig,
        pricing: PricingConfig,
        oracle: Arc<O>,
        sink: Arc<S>,
        publisher: Arc<P>,
        store: Arc<K>,
        clock: Arc<dyn TimeSource>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                pricing,
                oracle,
                sink,
                publisher,
                store,
                clock,
                payments: DashMap::new(),
                stats: Mutex::new(ConfirmationStats::default()),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    pub fn pricing(&self) -> &PricingConfig {
        &self.shared.pricing
    }

    pub fn config(&self) -> &VerificationConfig {
        &self.shared.config
    }

    /// Cancel every verification task.
    pub fn shutdown(&self) {
        self.shared.shutdown.cancel();
    }

    /// Reload payment records written before a restart.
    pub fn load_from_store(&self) -> VerificationResult<PaymentLoadReport> {
        let shared = &self.shared;
        let mut report = PaymentLoadReport::default();

        for (key, value) in shared.store.prefix_scan(PAYMENT_PREFIX)? {
            let mut payment = decode_payment(&key, &value)?;
            if !payment.is_terminal() {
                payment.process_event(PaymentEvent::Stopped {
                    reason: "verification interrupted by restart".into(),
                });
                shared.store.put(&key, &encode_payment(&payment)?)?;
                report.interrupted += 1;
            }

            {
                let mut stats = shared.stats.lock();
                stats.record_submitted();
                if let (PaymentState::Confirmed, Some(seconds)) =
                    (payment.state, payment.confirmation_time)
                {
                    stats.record_confirmed(seconds);
                }
            }
            shared.payments.insert(
                payment.transaction_id.clone(),
                TrackedPayment {
                    payment,
                    cancel: shared.shutdown.child_token(),
                    started: Instant::now(),
                },
            );
            report.payments += 1;
        }

        info!(
            subsystem = SUBSYSTEM,
            payments = report.payments,
            interrupted = report.interrupted,
            "Payments loaded from store"
        );
        Ok(report)
    }
}

impl<O, S, P, K> Shared<O, S, P, K>
where
    O: FinalityOracle + 'static,
    S: CreditSink + 'static,
    P: EventPublisher + 'static,
    K: KeyValueStore + 'static,
{
    fn snapshot(&self, transaction_id: &TransactionId) -> Option<PendingPayment> {
        self.payments
            .get(transaction_id)
            .map(|tracked| tracked.payment.clone())
    }

    /// Write the payment's current record. A failure is logged and the
    /// in-memory registry stays authoritative.
    fn persist(&self, transaction_id: &TransactionId) {
        let Some(payment) = self.snapshot(transaction_id) else {
            return;
        };
        let written = encode_payment(&payment).and_then(|bytes| {
            self.store
                .put(&payment_key(transaction_id), &bytes)
                .map_err(VerificationError::from)
        });
        if let Err(e) = written {
            error!(subsystem = SUBSYSTEM, tx_id = %transaction_id, error = %e, "Payment record not persisted");
        }
    }

    /// Feed an event to the payment. Releases the registry entry on return.
    fn apply(
        &self,
        transaction_id: &TransactionId,
        event: PaymentEvent,
    ) -> Option<(Transition, PendingPayment)> {
        let mut tracked = self.payments.get_mut(transaction_id)?;
        let transition = tracked.payment.process_event(event);
        Some((transition, tracked.payment.clone()))
    }

    fn confirmation(
        &self,
        transaction_id: &TransactionId,
        block_hash: Option<String>,
        block_height: Option<u64>,
    ) -> Confirmation {
        let confirmation_time = self
            .payments
            .get(transaction_id)
            .map(|tracked| tracked.started.elapsed().as_secs_f64())
            .unwrap_or_default();
        Confirmation {
            block_hash,
            block_height,
            confirmed_at: self.clock.now(),
            confirmation_time,
        }
    }

    async fn settle(&self, transaction_id: &TransactionId, event: PaymentEvent) -> Transition {
        let Some((transition, payment)) = self.apply(transaction_id, event) else {
            return Transition::Ignored;
        };
        if let Transition::Moved { from, to } = transition {
            if to.is_terminal() {
                self.on_terminal(from, &payment).await;
                self.persist(transaction_id);
            }
        }
        transition
    }

    async fn on_terminal(&self, from: PaymentState, payment: &PendingPayment) {
        let tx = &payment.transaction_id;

        if !from.is_terminal() {
            PAYMENTS_IN_FLIGHT.dec();
            self.oracle.forget(tx);
        }
        PAYMENTS_SETTLED
            .with_label_values(&[&payment.state.to_string()])
            .inc();

        match payment.state {
            PaymentState::Confirmed => {
                let seconds = payment.confirmation_time.unwrap_or_default();
                self.stats.lock().record_confirmed(seconds);
                CONFIRMATION_SECONDS.observe(seconds);
                log_tx_event!(
                    info,
                    SUBSYSTEM,
                    "Payment confirmed",
                    tx,
                    identity = %payment.identity,
                    polls = payment.poll_count,
                    confirmation_time = seconds
                );
                if let Err(e) = self.credit(payment).await {
                    error!(subsystem = SUBSYSTEM, tx_id = %tx, error = %e, "Confirmed payment not credited");
                }
            }
            PaymentState::TimedOut => {
                log_tx_event!(warn, SUBSYSTEM, "Payment verification timed out", tx, polls = payment.poll_count);
            }
            _ => {
                log_tx_event!(
                    warn,
                    SUBSYSTEM,
                    "Payment failed",
                    tx,
                    reason = payment.failure_reason.as_deref().unwrap_or("unknown")
                );
            }
        }

        self.publisher
            .publish(CanvasEvent::PaymentSettled {
                transaction_id: tx.clone(),
                identity: payment.identity.clone(),
                state: payment.state,
                expected_units: payment.expected_units,
            })
            .await;
    }

    async fn credit(&self, payment: &PendingPayment) -> Result<(), CreditSinkError> {
        let result = self
            .sink
            .credit(
                &payment.identity,
                &payment.transaction_id,
                payment.expected_units,
            )
            .await;

        if let Some(mut tracked) = self.payments.get_mut(&payment.transaction_id) {
            match &result {
                Ok(_) => {
                    tracked.payment.credited = true;
                    tracked.payment.failure_reason = None;
                }
                Err(e) => tracked.payment.failure_reason = Some(e.to_string()),
            }
        }

        match result? {
            CreditReceipt::Applied { balance } => {
                debug!(subsystem = SUBSYSTEM, tx_id = %payment.transaction_id, balance, "Credit delivered");
            }
            CreditReceipt::AlreadyApplied => {
                debug!(subsystem = SUBSYSTEM, tx_id = %payment.transaction_id, "Credit already applied");
            }
        }
        Ok(())
    }

    /// Poll the oracle until the payment settles, the window closes or the
    /// token is cancelled.
    async fn poll_until_settled(
        self: Arc<Self>,
        transaction_id: TransactionId,
        cancel: CancellationToken,
        started: Instant,
    ) {
        let deadline = started + self.config.timeout;
        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(subsystem = SUBSYSTEM, tx_id = %transaction_id, "Verification cancelled");
                    return;
                }
                _ = tokio::time::sleep_until(deadline) => {
                    self.settle(&transaction_id, PaymentEvent::DeadlineExceeded).await;
                    return;
                }
                _ = ticker.tick() => {}
            }

            if cancel.is_cancelled() {
                return;
            }
            self.apply(&transaction_id, PaymentEvent::PollStarted);

            let polled = tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                polled = tokio::time::timeout_at(deadline, self.oracle.check(&transaction_id)) => polled,
            };
            if cancel.is_cancelled() {
                return;
            }

            let event = match polled {
                Err(_elapsed) => PaymentEvent::DeadlineExceeded,
                Ok(Ok(OracleStatus::NotSeen)) => PaymentEvent::NotSeen,
                Ok(Ok(OracleStatus::Confirmed {
                    block_hash,
                    block_height,
                })) => PaymentEvent::Confirmed(self.confirmation(
                    &transaction_id,
                    Some(block_hash),
                    block_height,
                )),
                Ok(Ok(OracleStatus::Rejected { reason })) => PaymentEvent::Rejected { reason },
                Ok(Err(e)) => {
                    ORACLE_ERRORS.inc();
                    debug!(subsystem = SUBSYSTEM, tx_id = %transaction_id, error = %e, "Oracle query failed, retrying");
                    PaymentEvent::OracleFailed {
                        reason: e.to_string(),
                    }
                }
            };

            self.settle(&transaction_id, event).await;

            match self.snapshot(&transaction_id) {
                Some(payment) if !payment.is_terminal() => {}
                _ => return,
            }
        }
    }
}

#[async_trait]
impl<O, S, P, K> VerificationApi for VerificationService<O, S, P, K>
where
    O: FinalityOracle + 'static,
    S: CreditSink + 'static,
    P: EventPublisher + 'static,
    K: KeyValueStore + 'static,
{
    async fn submit(&self, request: PaymentRequest) -> VerificationResult<SubmitOutcome> {
        let shared = &self.shared;
        if shared.pricing.receiver_address.is_none() {
            return Err(VerificationError::ReceiverNotConfigured);
        }

        let units = shared.pricing.units_for_amount(request.amount_sompi);
        if units == 0 {
            return Err(VerificationError::AmountTooSmall {
                amount_sompi: request.amount_sompi,
                pack_cost_sompi: shared.pricing.pack_cost_sompi,
            });
        }

        let tx = request.transaction_id.clone();
        let credited = shared.sink.is_credited(&tx);
        let fresh = || {
            let mut payment = PendingPayment::new(
                tx.clone(),
                request.identity.clone(),
                units,
                request.amount_sompi,
                shared.clock.now(),
            );
            if credited {
                payment.process_event(PaymentEvent::AlreadyCredited);
            }
            TrackedPayment {
                payment,
                cancel: shared.shutdown.child_token(),
                started: Instant::now(),
            }
        };

        let (cancel, started) = match shared.payments.entry(tx.clone()) {
            Entry::Occupied(mut existing) => {
                let state = existing.get().payment.state;
                if !matches!(state, PaymentState::TimedOut | PaymentState::Failed) {
                    let payment = existing.get().payment.clone();
                    drop(existing);
                    return Ok(SubmitOutcome {
                        current_balance: shared.sink.balance_of(&payment.identity),
                        payment,
                        started: false,
                    });
                }
                log_tx_event!(info, SUBSYSTEM, "Resubmitted payment", tx, previous = %state);
                let tracked = fresh();
                let handles = (tracked.cancel.clone(), tracked.started);
                existing.insert(tracked);
                handles
            }
            Entry::Vacant(slot) => {
                let tracked = fresh();
                let handles = (tracked.cancel.clone(), tracked.started);
                slot.insert(tracked);
                handles
            }
        };

        shared.persist(&tx);

        if credited {
            log_tx_event!(info, SUBSYSTEM, "Transaction already credited", tx, identity = %request.identity);
            let payment = shared
                .snapshot(&tx)
                .ok_or_else(|| VerificationError::UnknownTransaction(tx.clone()))?;
            return Ok(SubmitOutcome {
                current_balance: shared.sink.balance_of(&payment.identity),
                payment,
                started: false,
            });
        }

        shared.stats.lock().record_submitted();
        PAYMENTS_IN_FLIGHT.inc();
        log_tx_event!(
            info,
            SUBSYSTEM,
            "Payment submitted",
            tx,
            identity = %request.identity,
            amount_sompi = request.amount_sompi,
            units
        );

        if shared.config.enabled {
            tokio::spawn(Arc::clone(shared).poll_until_settled(tx.clone(), cancel, started));
        } else {
            let confirmation = shared.confirmation(&tx, None, None);
            shared
                .settle(&tx, PaymentEvent::Confirmed(confirmation))
                .await;
        }

        let payment = shared
            .snapshot(&tx)
            .ok_or_else(|| VerificationError::UnknownTransaction(tx.clone()))?;
        Ok(SubmitOutcome {
            current_balance: shared.sink.balance_of(&payment.identity),
            payment,
            started: true,
        })
    }

    fn status(&self, transaction_id: &TransactionId) -> Option<PendingPayment> {
        self.shared.snapshot(transaction_id)
    }

    fn transaction_metrics(&self, transaction_id: &TransactionId) -> Option<TransactionMetrics> {
        self.shared
            .snapshot(transaction_id)
            .map(|payment| TransactionMetrics {
                transaction_id: payment.transaction_id.to_string(),
                start_time: payment.submitted_at,
                confirmed: payment.state == PaymentState::Confirmed,
                confirmation_time: payment.confirmation_time,
            })
    }

    fn summary(&self) -> MetricsSummary {
        self.shared.stats.lock().summary()
    }

    async fn reconcile(
        &self,
        transaction_id: &TransactionId,
    ) -> VerificationResult<PendingPayment> {
        let shared = &self.shared;
        let payment = shared
            .snapshot(transaction_id)
            .ok_or_else(|| VerificationError::UnknownTransaction(transaction_id.clone()))?;

        match payment.state {
            PaymentState::Confirmed if payment.credited => return Ok(payment),
            PaymentState::Confirmed => {
                let credited = shared.credit(&payment).await;
                shared.persist(transaction_id);
                credited?;
                return shared
                    .snapshot(transaction_id)
                    .ok_or_else(|| VerificationError::UnknownTransaction(transaction_id.clone()));
            }
            PaymentState::TimedOut | PaymentState::Failed => {}
            state => {
                return Err(VerificationError::NotReconcilable {
                    transaction_id: transaction_id.clone(),
                    state,
                })
            }
        }

        let status = shared.oracle.lookup(transaction_id).await?;

        if let OracleStatus::Confirmed {
            block_hash,
            block_height,
        } = status
        {
            let confirmation = shared.confirmation(transaction_id, Some(block_hash), block_height);
            let transition = shared
                .settle(transaction_id, PaymentEvent::Reconciled(confirmation))
                .await;
            if transition.confirmed() {
                log_tx_event!(info, SUBSYSTEM, "Payment reconciled", transaction_id);
            }
        } else {
            log_tx_event!(info, SUBSYSTEM, "Reconciliation found no confirmation", transaction_id);
        }

        shared
            .snapshot(transaction_id)
            .ok_or_else(|| VerificationError::UnknownTransaction(transaction_id.clone()))
    }

    async fn cancel(&self, transaction_id: &TransactionId) -> bool {
        let shared = &self.shared;
        match shared.payments.get(transaction_id) {
            Some(tracked) if !tracked.payment.is_terminal() => tracked.cancel.cancel(),
            _ => return false,
        }
        shared
            .settle(
                transaction_id,
                PaymentEvent::Stopped {
                    reason: "verification cancelled".into(),
                },
            )
            .await
            .entered_terminal()
    }

    fn in_flight(&self) -> usize {
        self.shared
            .payments
            .iter()
            .filter(|tracked| !tracked.payment.is_terminal())
            .count()
    }
}
