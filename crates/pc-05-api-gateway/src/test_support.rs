//! Hand-written port doubles shared by the router and stream tests.

use crate::ports::outbound::{AdmissionApi, CanvasReader, CreditLedgerApi, VerificationApi};
use crate::router::{GatewayState, StreamSettings};
use async_trait::async_trait;
use parking_lot::Mutex;
use pc_02_credit_ledger::{
    AdmissionError, AdmissionResult, CreditOutcome, DebitOutcome, DenialReason, LedgerResult,
    WriteReceipt, WriteRequest,
};
use pc_03_payment_verification::{
    PaymentRequest, PendingPayment, SubmitOutcome, VerificationError, VerificationResult,
};
use shared_bus::{CanvasEvent, EventPublisher, InMemoryEventBus};
use shared_types::{
    CanvasDimensions, CanvasSnapshot, Cell, ClientConfig, Identity, MetricsSummary,
    TransactionId, TransactionMetrics,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Default)]
pub struct MockLedger {
    balances: Mutex<HashMap<Identity, u64>>,
}

impl MockLedger {
    pub fn set_balance(&self, identity: &str, units: u64) {
        self.balances
            .lock()
            .insert(Identity::new(identity).unwrap(), units);
    }

    pub fn balance(&self, identity: &str) -> u64 {
        self.balance_of(&Identity::new(identity).unwrap())
    }
}

#[async_trait]
impl CreditLedgerApi for MockLedger {
    fn try_debit(&self, identity: &Identity, units: u64) -> LedgerResult<DebitOutcome> {
        let mut balances = self.balances.lock();
        let balance = balances.entry(identity.clone()).or_default();
        if *balance < units {
            return Ok(DebitOutcome::Denied(DenialReason::InsufficientCredit {
                balance: *balance,
            }));
        }
        *balance -= units;
        Ok(DebitOutcome::Granted {
            remaining: *balance,
        })
    }

    fn refund(&self, identity: &Identity, units: u64) -> LedgerResult<u64> {
        let mut balances = self.balances.lock();
        let balance = balances.entry(identity.clone()).or_default();
        *balance += units;
        Ok(*balance)
    }

    async fn credit(
        &self,
        identity: &Identity,
        _transaction_id: &TransactionId,
        units: u64,
    ) -> LedgerResult<CreditOutcome> {
        let balance = self.refund(identity, units)?;
        Ok(CreditOutcome::Applied { balance })
    }

    fn balance_of(&self, identity: &Identity) -> u64 {
        self.balances.lock().get(identity).copied().unwrap_or(0)
    }

    fn is_credited(&self, _transaction_id: &TransactionId) -> bool {
        false
    }
}

/// 10x10 canvas whose write path debits the mock ledger and publishes deltas.
pub struct MockCanvas {
    ledger: Arc<MockLedger>,
    bus: Arc<InMemoryEventBus>,
    cells: Mutex<HashMap<(u32, u32), Cell>>,
    revision: Mutex<u64>,
}

impl MockCanvas {
    /// Commit a cell without going through admission.
    pub async fn commit(&self, mut cell: Cell) -> Cell {
        {
            let mut revision = self.revision.lock();
            *revision += 1;
            cell.revision = *revision;
        }
        self.cells.lock().insert((cell.x, cell.y), cell.clone());
        self.bus
            .publish(CanvasEvent::CellCommitted(cell.clone()))
            .await;
        cell
    }
}

impl CanvasReader for MockCanvas {
    fn snapshot(&self) -> CanvasSnapshot {
        let cells: Vec<Cell> = self.cells.lock().values().cloned().collect();
        CanvasSnapshot {
            revision: *self.revision.lock(),
            cells,
        }
    }

    fn dimensions(&self) -> CanvasDimensions {
        CanvasDimensions::new(10, 10)
    }
}

#[async_trait]
impl AdmissionApi for MockCanvas {
    async fn write(&self, request: WriteRequest) -> AdmissionResult<WriteReceipt> {
        let dims = self.dimensions();
        if !dims.contains(request.coord) {
            return Err(AdmissionError::OutOfBounds {
                x: request.coord.x,
                y: request.coord.y,
                width: dims.width,
                height: dims.height,
            });
        }
        let remaining = match self.ledger.try_debit(&request.identity, 1)? {
            DebitOutcome::Granted { remaining } => remaining,
            DebitOutcome::Denied(DenialReason::InsufficientCredit { balance }) => {
                return Err(AdmissionError::InsufficientCredit {
                    identity: request.identity,
                    balance,
                })
            }
        };
        let cell = self
            .commit(Cell {
                x: request.coord.x,
                y: request.coord.y,
                color: request.color,
                owner: request.identity,
                written_at: 0,
                revision: 0,
                write_id: request.write_id,
            })
            .await;
        Ok(WriteReceipt {
            cell,
            remaining_balance: remaining,
            replayed: false,
        })
    }
}

/// Records submissions; never polls.
#[derive(Default)]
pub struct MockVerification {
    payments: Mutex<HashMap<TransactionId, PendingPayment>>,
}

#[async_trait]
impl VerificationApi for MockVerification {
    async fn submit(&self, request: PaymentRequest) -> VerificationResult<SubmitOutcome> {
        let units = request.amount_sompi / 20_000_000 * 10;
        if units == 0 {
            return Err(VerificationError::AmountTooSmall {
                amount_sompi: request.amount_sompi,
                pack_cost_sompi: 20_000_000,
            });
        }
        let payment = PendingPayment::new(
            request.transaction_id.clone(),
            request.identity,
            units,
            request.amount_sompi,
            0,
        );
        self.payments
            .lock()
            .insert(request.transaction_id, payment.clone());
        Ok(SubmitOutcome {
            payment,
            started: true,
            current_balance: 0,
        })
    }

    fn status(&self, transaction_id: &TransactionId) -> Option<PendingPayment> {
        self.payments.lock().get(transaction_id).cloned()
    }

    fn transaction_metrics(&self, _transaction_id: &TransactionId) -> Option<TransactionMetrics> {
        None
    }

    fn summary(&self) -> MetricsSummary {
        MetricsSummary::default()
    }

    async fn reconcile(
        &self,
        transaction_id: &TransactionId,
    ) -> VerificationResult<PendingPayment> {
        match self.status(transaction_id) {
            Some(payment) => Err(VerificationError::NotReconcilable {
                transaction_id: transaction_id.clone(),
                state: payment.state,
            }),
            None => Err(VerificationError::UnknownTransaction(transaction_id.clone())),
        }
    }

    async fn cancel(&self, _transaction_id: &TransactionId) -> bool {
        false
    }

    fn in_flight(&self) -> usize {
        self.payments.lock().len()
    }
}

pub struct TestHarness {
    pub state: GatewayState,
    pub ledger: Arc<MockLedger>,
    pub canvas: Arc<MockCanvas>,
    pub bus: Arc<InMemoryEventBus>,
}

pub fn create_test_state() -> TestHarness {
    create_test_state_with_bus(Arc::new(InMemoryEventBus::new()))
}

pub fn create_test_state_with_bus(bus: Arc<InMemoryEventBus>) -> TestHarness {
    let ledger = Arc::new(MockLedger::default());
    let canvas = Arc::new(MockCanvas {
        ledger: ledger.clone(),
        bus: bus.clone(),
        cells: Mutex::new(HashMap::new()),
        revision: Mutex::new(0),
    });

    let state = GatewayState {
        admission: canvas.clone(),
        ledger: ledger.clone(),
        verification: Arc::new(MockVerification::default()),
        canvas: canvas.clone(),
        bus: bus.clone(),
        client_config: Arc::new(ClientConfig {
            canvas_width: 10,
            canvas_height: 10,
            pixel_pack_cost_sompi: 20_000_000,
            pixel_pack_size: 10,
            receiver_address: Some("kaspa:receiver".into()),
            verify_transactions: true,
            verification_timeout_ms: 120_000,
            transaction_check_interval_ms: 500,
            balance_poll_interval_ms: 500,
            balance_max_wait_ms: 10_000,
            balance_anomaly_threshold: 3,
        }),
        stream: StreamSettings {
            ping_interval: Duration::from_millis(200),
            idle_timeout: Duration::from_secs(2),
        },
        shutdown: CancellationToken::new(),
    };

    TestHarness {
        state,
        ledger,
        canvas,
        bus,
    }
}
