//! Shared fixtures: a finality oracle driven by the test and a node running
//! on an ephemeral port.

use async_trait::async_trait;
use node_runtime::adapters::NodeStore;
use node_runtime::{NodeConfig, NodeRuntime, SubsystemContainer};
use pc_03_payment_verification::{FinalityOracle, OracleError, OracleStatus};
use parking_lot::Mutex;
use shared_types::TransactionId;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// When the oracle starts reporting a transaction as confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmAt {
    /// On the n-th check of that transaction (1-based).
    Check(u32),
    /// Only after [`ScriptedOracle::release`].
    Released,
}

/// Oracle whose answers follow a per-test script.
pub struct ScriptedOracle {
    confirm_at: ConfirmAt,
    released: Mutex<bool>,
    checks: Mutex<HashMap<TransactionId, u32>>,
    total_checks: AtomicU32,
}

impl ScriptedOracle {
    pub fn new(confirm_at: ConfirmAt) -> Self {
        Self {
            confirm_at,
            released: Mutex::new(false),
            checks: Mutex::new(HashMap::new()),
            total_checks: AtomicU32::new(0),
        }
    }

    /// From now on every transaction is confirmed.
    pub fn release(&self) {
        *self.released.lock() = true;
    }

    pub fn checks_of(&self, transaction_id: &TransactionId) -> u32 {
        self.checks.lock().get(transaction_id).copied().unwrap_or(0)
    }

    pub fn total_checks(&self) -> u32 {
        self.total_checks.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FinalityOracle for ScriptedOracle {
    async fn check(&self, transaction_id: &TransactionId) -> Result<OracleStatus, OracleError> {
        self.total_checks.fetch_add(1, Ordering::SeqCst);
        let n = {
            let mut checks = self.checks.lock();
            let n = checks.entry(transaction_id.clone()).or_default();
            *n += 1;
            *n
        };

        let confirmed = match self.confirm_at {
            ConfirmAt::Check(at) => n >= at,
            ConfirmAt::Released => *self.released.lock(),
        };
        if confirmed {
            Ok(OracleStatus::Confirmed {
                block_hash: format!("block-{transaction_id}"),
                block_height: Some(1_000 + u64::from(n)),
            })
        } else {
            Ok(OracleStatus::NotSeen)
        }
    }
}

/// Subsystems over an in-memory store and a scripted oracle.
pub fn create_test_container(
    config: NodeConfig,
    oracle: Arc<ScriptedOracle>,
) -> SubsystemContainer<ScriptedOracle> {
    SubsystemContainer::new(config, NodeStore::in_memory(), oracle)
}

/// A started node and the oracle behind it.
pub struct TestNode {
    pub runtime: NodeRuntime<ScriptedOracle>,
    pub oracle: Arc<ScriptedOracle>,
    pub addr: SocketAddr,
}

impl TestNode {
    pub async fn start(confirm_at: ConfirmAt) -> Self {
        Self::start_with(NodeConfig::for_testing(), confirm_at).await
    }

    pub async fn start_with(config: NodeConfig, confirm_at: ConfirmAt) -> Self {
        let oracle = Arc::new(ScriptedOracle::new(confirm_at));
        let runtime = NodeRuntime::new(create_test_container(config, Arc::clone(&oracle)));
        let addr = runtime.start().await.expect("node starts");
        Self {
            runtime,
            oracle,
            addr,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub async fn stop(self) {
        self.runtime.shutdown().await;
    }
}

/// Poll `condition` every 20ms until it holds or `within` elapses.
pub async fn eventually<F>(within: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + within;
    loop {
        if condition() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
