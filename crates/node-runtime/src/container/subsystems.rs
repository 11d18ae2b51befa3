//! # Subsystem Container
//!
//! Holds all subsystem instances and wires their ports.
//!
//! ## Initialization Order
//!
//! ```text
//! Level 0: Event bus, key-value store
//! Level 1: Canvas store (pc-01), credit ledger (pc-02)
//! Level 2: Admission gate (pc-02 over pc-01)
//! Level 3: Payment verification (pc-03 crediting pc-02, records in the store)
//! Level 4: API gateway state (pc-05 over all of the above)
//! ```
//!
//! ## Thread Safety
//!
//! Every service is internally synchronized and shared through `Arc`; the
//! container itself is immutable after construction.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use pc_01_canvas_store::{CanvasStoreService, LoadReport};
use pc_02_credit_ledger::{AdmissionGate, CreditLedgerService, LedgerLoadReport};
use pc_03_payment_verification::{
    FinalityOracle, KaspaRestOracle, PaymentLoadReport, VerificationService,
};
use pc_05_api_gateway::{GatewayState, StreamSettings};
use shared_bus::InMemoryEventBus;
use shared_types::{SystemTimeSource, TimeSource};

use crate::adapters::{CanvasStoreAdapter, LedgerCreditSink, NodeStore};
use crate::container::config::NodeConfig;
use crate::error::NodeResult;

pub type CanvasService = CanvasStoreService<NodeStore, InMemoryEventBus>;
pub type LedgerService = CreditLedgerService<NodeStore, InMemoryEventBus>;
pub type CanvasAdapter = CanvasStoreAdapter<CanvasService>;
pub type Admission = AdmissionGate<LedgerService, CanvasAdapter>;
pub type Verification<O> =
    VerificationService<O, LedgerCreditSink<LedgerService>, InMemoryEventBus, NodeStore>;

/// What the startup reload found.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StartupReport {
    pub canvas: LoadReport,
    pub ledger: LedgerLoadReport,
    pub payments: PaymentLoadReport,
}

/// Central container holding all subsystem instances.
pub struct SubsystemContainer<O: FinalityOracle + 'static = KaspaRestOracle> {
    pub config: NodeConfig,
    pub event_bus: Arc<InMemoryEventBus>,
    pub store: Arc<NodeStore>,
    pub canvas: Arc<CanvasService>,
    pub canvas_adapter: Arc<CanvasAdapter>,
    pub ledger: Arc<LedgerService>,
    pub admission: Arc<Admission>,
    pub verification: Verification<O>,
}

impl SubsystemContainer<KaspaRestOracle> {
    /// Open the configured store and the Kaspa REST oracle.
    pub fn from_config(config: NodeConfig) -> NodeResult<Self> {
        config.validate()?;
        let store = NodeStore::open(&config.storage)?;
        let oracle = KaspaRestOracle::new(
            config.verification.oracle_url.clone(),
            config.verification.oracle_request_timeout,
        )?;
        Ok(Self::new(config, store, Arc::new(oracle)))
    }
}

impl<O: FinalityOracle + 'static> SubsystemContainer<O> {
    /// Wire every subsystem over `store` and `oracle`.
    pub fn new(config: NodeConfig, store: NodeStore, oracle: Arc<O>) -> Self {
        info!(backend = store.backend(), "Initializing subsystems");

        // Level 0
        let event_bus = Arc::new(InMemoryEventBus::with_capacity(config.event_bus_capacity));
        let store = Arc::new(store);
        let clock: Arc<dyn TimeSource> = Arc::new(SystemTimeSource);

        // Level 1
        let canvas = Arc::new(CanvasStoreService::new(
            &config.canvas,
            Arc::clone(&store),
            Arc::clone(&event_bus),
            Arc::clone(&clock),
        ));
        let ledger = Arc::new(CreditLedgerService::new(
            Arc::clone(&store),
            Arc::clone(&event_bus),
            Arc::clone(&clock),
        ));

        // Level 2
        let canvas_adapter = Arc::new(CanvasStoreAdapter::new(Arc::clone(&canvas)));
        let admission = Arc::new(AdmissionGate::new(
            &config.admission,
            Arc::clone(&ledger),
            Arc::clone(&canvas_adapter),
        ));

        // Level 3
        let verification = VerificationService::new(
            config.verification.clone(),
            config.pricing.clone(),
            oracle,
            Arc::new(LedgerCreditSink::new(Arc::clone(&ledger))),
            Arc::clone(&event_bus),
            Arc::clone(&store),
            clock,
        );

        info!(
            width = config.canvas.width,
            height = config.canvas.height,
            verify_transactions = config.verification.enabled,
            receiver_configured = config.pricing.receiver_address.is_some(),
            "Subsystems initialized"
        );

        Self {
            config,
            event_bus,
            store,
            canvas,
            canvas_adapter,
            ledger,
            admission,
            verification,
        }
    }

    /// Reload the canvas, the ledger and payment records from the store.
    pub fn load_state(&self) -> NodeResult<StartupReport> {
        let canvas = self.canvas.load_from_store()?;
        let ledger = self.ledger.load_from_store()?;
        let payments = self.verification.load_from_store()?;
        Ok(StartupReport {
            canvas,
            ledger,
            payments,
        })
    }

    /// Level 4: the state every gateway handler works on.
    pub fn gateway_state(&self, shutdown: CancellationToken) -> GatewayState {
        GatewayState {
            admission: self.admission.clone(),
            ledger: self.ledger.clone(),
            verification: Arc::new(self.verification.clone()),
            canvas: self.canvas_adapter.clone(),
            bus: Arc::clone(&self.event_bus),
            client_config: Arc::new(self.config.client_config()),
            stream: StreamSettings {
                ping_interval: self.config.gateway.ws_ping_interval,
                idle_timeout: self.config.gateway.ws_idle_timeout,
            },
            shutdown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pc_01_canvas_store::CanvasStoreApi;
    use pc_02_credit_ledger::{AdmissionApi, CreditLedgerApi, WriteRequest};
    use pc_03_payment_verification::{
        OracleError, OracleStatus, PaymentRequest, VerificationApi,
    };
    use shared_types::storage::KeyValueStore;
    use shared_types::{Color, Coord, Identity, PaymentState, TransactionId, WriteId};

    struct NeverSeen;

    #[async_trait]
    impl FinalityOracle for NeverSeen {
        async fn check(&self, _: &TransactionId) -> Result<OracleStatus, OracleError> {
            Ok(OracleStatus::NotSeen)
        }
    }

    fn create_test_container(store: NodeStore) -> SubsystemContainer<NeverSeen> {
        SubsystemContainer::new(NodeConfig::for_testing(), store, Arc::new(NeverSeen))
    }

    fn write(x: u32, write_id: &str) -> WriteRequest {
        WriteRequest {
            coord: Coord::new(x, 0),
            color: Color::from_rgb(255, 0, 0),
            identity: Identity::new("kaspa:alice").unwrap(),
            write_id: WriteId::new(write_id).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_admission_commits_through_canvas_adapter() {
        let container = create_test_container(NodeStore::in_memory());
        let alice = Identity::new("kaspa:alice").unwrap();
        container
            .ledger
            .credit(&alice, &TransactionId::parse("tx-1").unwrap(), 2)
            .await
            .unwrap();

        let receipt = container.admission.write(write(3, "w1")).await.unwrap();
        assert_eq!(receipt.remaining_balance, 1);
        assert_eq!(
            container.canvas.get(Coord::new(3, 0)).unwrap(),
            Some(receipt.cell)
        );
    }

    #[tokio::test]
    async fn test_state_survives_reload() {
        let first = create_test_container(NodeStore::in_memory());
        let alice = Identity::new("kaspa:alice").unwrap();
        first
            .ledger
            .credit(&alice, &TransactionId::parse("tx-1").unwrap(), 5)
            .await
            .unwrap();
        first.admission.write(write(1, "w1")).await.unwrap();

        // Same records in a fresh store, as if the database were reopened.
        let reopened = NodeStore::in_memory();
        for prefix in [&b"cell:"[..], b"balance:", b"applied:", b"payment:"] {
            for (key, value) in first.store.prefix_scan(prefix).unwrap() {
                reopened.put(&key, &value).unwrap();
            }
        }

        let second = create_test_container(reopened);
        let report = second.load_state().unwrap();

        assert_eq!(report.canvas.cells_loaded, 1);
        assert_eq!(report.canvas.revision, 1);
        assert_eq!(report.ledger.accounts, 1);
        assert_eq!(report.ledger.applied_transactions, 1);
        assert_eq!(second.ledger.balance_of(&alice), 4);
        assert!(second
            .ledger
            .is_credited(&TransactionId::parse("tx-1").unwrap()));
        assert_eq!(report.payments.payments, 0);
    }

    #[tokio::test]
    async fn test_credited_payment_resubmitted_after_restart_is_not_polled() {
        let mut config = NodeConfig::for_testing();
        config.verification.enabled = false;
        let first = SubsystemContainer::new(config, NodeStore::in_memory(), Arc::new(NeverSeen));
        let alice = Identity::new("kaspa:alice").unwrap();
        let tx = TransactionId::parse("tx-1").unwrap();
        let request = PaymentRequest {
            transaction_id: tx.clone(),
            identity: alice.clone(),
            amount_sompi: first.config.pricing.pack_cost_sompi,
        };
        first.verification.submit(request.clone()).await.unwrap();
        assert!(first.ledger.is_credited(&tx));

        // Only the ledger survives; the payment record is lost.
        let reopened = NodeStore::in_memory();
        for prefix in [&b"balance:"[..], b"applied:"] {
            for (key, value) in first.store.prefix_scan(prefix).unwrap() {
                reopened.put(&key, &value).unwrap();
            }
        }
        let second = create_test_container(reopened);
        second.load_state().unwrap();

        let outcome = second.verification.submit(request.clone()).await.unwrap();
        assert!(!outcome.started);
        assert_eq!(outcome.payment.state, PaymentState::Confirmed);
        assert_eq!(second.verification.in_flight(), 0);

        // With the payment record kept, the reload restores it directly.
        let kept = NodeStore::in_memory();
        for prefix in [&b"balance:"[..], b"applied:", b"payment:"] {
            for (key, value) in first.store.prefix_scan(prefix).unwrap() {
                kept.put(&key, &value).unwrap();
            }
        }
        let third = create_test_container(kept);
        let report = third.load_state().unwrap();
        assert_eq!(report.payments.payments, 1);
        let payment = third.verification.status(&tx).unwrap();
        assert_eq!(payment.state, PaymentState::Confirmed);
        assert!(payment.credited);
        assert_eq!(third.ledger.balance_of(&alice), payment.expected_units);
    }

    #[test]
    fn test_gateway_state_publishes_client_config() {
        let container = create_test_container(NodeStore::in_memory());
        let state = container.gateway_state(CancellationToken::new());
        assert_eq!(state.client_config.canvas_width, 16);
        assert_eq!(
            state.client_config.receiver_address.as_deref(),
            Some("kaspa:receiver")
        );
        assert_eq!(
            state.stream.ping_interval,
            container.config.gateway.ws_ping_interval
        );
    }
}
