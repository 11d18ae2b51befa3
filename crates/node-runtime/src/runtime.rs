//! # Node Runtime
//!
//! ## Startup Sequence
//!
//! 1. Reload the canvas and the ledger from the store
//! 2. Bind the HTTP listener
//! 3. Serve the API gateway until shutdown
//!
//! ## Shutdown Sequence
//!
//! 1. Cancel the shared token: the gateway stops accepting and closes streams
//! 2. Cancel in-flight verification tasks
//! 3. Wait (bounded) for the gateway task to finish

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use pc_03_payment_verification::{FinalityOracle, KaspaRestOracle};
use pc_05_api_gateway::{ApiGatewayService, GatewayResult};

use crate::container::{NodeConfig, StartupReport, SubsystemContainer};
use crate::error::{NodeError, NodeResult};

/// How long shutdown waits for the gateway to drain.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// The main node runtime orchestrating all subsystems.
pub struct NodeRuntime<O: FinalityOracle + 'static = KaspaRestOracle> {
    container: Arc<SubsystemContainer<O>>,
    shutdown: CancellationToken,
    gateway: Mutex<Option<JoinHandle<GatewayResult<()>>>>,
}

impl NodeRuntime<KaspaRestOracle> {
    /// Build the production node from configuration.
    pub fn from_config(config: NodeConfig) -> NodeResult<Self> {
        Ok(Self::new(SubsystemContainer::from_config(config)?))
    }
}

impl<O: FinalityOracle + 'static> NodeRuntime<O> {
    pub fn new(container: SubsystemContainer<O>) -> Self {
        Self {
            container: Arc::new(container),
            shutdown: CancellationToken::new(),
            gateway: Mutex::new(None),
        }
    }

    /// Reload state and start serving. Returns the bound address.
    pub async fn start(&self) -> NodeResult<SocketAddr> {
        if self.gateway.lock().is_some() {
            return Err(NodeError::AlreadyStarted);
        }

        info!("===========================================");
        info!("  Pixel Canvas Node v{}", env!("CARGO_PKG_VERSION"));
        info!("===========================================");

        let report: StartupReport = self.container.load_state()?;
        info!(
            cells = report.canvas.cells_loaded,
            skipped_cells = report.canvas.skipped,
            revision = report.canvas.revision,
            accounts = report.ledger.accounts,
            applied_transactions = report.ledger.applied_transactions,
            payments = report.payments.payments,
            interrupted_payments = report.payments.interrupted,
            "State reloaded"
        );

        let config = self.container.config.gateway.clone();
        let addr = config.http_addr();
        let listener = TcpListener::bind(addr).await.map_err(|e| NodeError::Bind {
            addr: addr.to_string(),
            reason: e.to_string(),
        })?;
        let bound = listener.local_addr().map_err(|e| NodeError::Bind {
            addr: addr.to_string(),
            reason: e.to_string(),
        })?;

        let state = self.container.gateway_state(self.shutdown.clone());
        let service = ApiGatewayService::new(config, state)?;
        let handle = tokio::spawn(service.serve(listener));
        *self.gateway.lock() = Some(handle);

        info!(%bound, "Node ready");
        Ok(bound)
    }

    /// Shut down gracefully. Safe to call more than once.
    pub async fn shutdown(&self) {
        info!("Initiating graceful shutdown...");
        self.shutdown.cancel();
        self.container.verification.shutdown();

        let handle = self.gateway.lock().take();
        if let Some(handle) = handle {
            match tokio::time::timeout(SHUTDOWN_GRACE, handle).await {
                Ok(Ok(Ok(()))) => {}
                Ok(Ok(Err(e))) => error!(error = %e, "API gateway stopped with an error"),
                Ok(Err(e)) => error!(error = %e, "API gateway task failed"),
                Err(_) => warn!("API gateway did not stop within the grace period"),
            }
        }
        info!("Shutdown complete");
    }

    /// Resolves once shutdown has been requested.
    pub async fn stopped(&self) {
        self.shutdown.cancelled().await;
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Get a reference to the subsystem container.
    pub fn container(&self) -> Arc<SubsystemContainer<O>> {
        Arc::clone(&self.container)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::NodeStore;
    use async_trait::async_trait;
    use pc_03_payment_verification::{OracleError, OracleStatus};
    use shared_types::{HealthResponse, TransactionId};

    struct NeverSeen;

    #[async_trait]
    impl FinalityOracle for NeverSeen {
        async fn check(&self, _: &TransactionId) -> Result<OracleStatus, OracleError> {
            Ok(OracleStatus::NotSeen)
        }
    }

    fn create_test_runtime() -> NodeRuntime<NeverSeen> {
        NodeRuntime::new(SubsystemContainer::new(
            NodeConfig::for_testing(),
            NodeStore::in_memory(),
            Arc::new(NeverSeen),
        ))
    }

    #[tokio::test]
    async fn test_start_serves_health_until_shutdown() {
        let runtime = create_test_runtime();
        let addr = runtime.start().await.unwrap();

        let health: HealthResponse = reqwest::get(format!("http://{addr}/health"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(health.status, "ok");

        runtime.shutdown().await;
        assert!(reqwest::get(format!("http://{addr}/health")).await.is_err());
    }

    #[tokio::test]
    async fn test_double_start_rejected() {
        let runtime = create_test_runtime();
        runtime.start().await.unwrap();
        assert!(matches!(
            runtime.start().await,
            Err(NodeError::AlreadyStarted)
        ));
        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_before_start_is_harmless() {
        let runtime = create_test_runtime();
        runtime.shutdown().await;
        runtime.stopped().await;
    }
}
