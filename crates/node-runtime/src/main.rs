//! # Pixel Canvas Node
//!
//! The server executable: one process hosting the canvas store, the credit
//! ledger and admission gate, payment verification and the API gateway.
//!
//! ```text
//! HTTP/WS clients
//!       │
//!       ↓
//! API Gateway (pc-05) ──write──→ Admission Gate (pc-02) ──commit──→ Canvas Store (pc-01)
//!       │                              │                                  │
//!       │                        Credit Ledger ←──credit── Payment         │
//!       │                              ↑                  Verification     │
//!       │                              │                  (pc-03) ──poll──→ Kaspa REST
//!       └──────────── /ws ←──── Event Bus ←───────────── CellCommitted ─────┘
//! ```
//!
//! ## Startup Sequence
//!
//! 1. Initialize logging and metrics
//! 2. Load configuration (defaults, `PC_CONFIG_FILE`, environment)
//! 3. Initialize subsystems and reload persisted state
//! 4. Serve until Ctrl+C

use anyhow::{Context, Result};
use canvas_telemetry::{init_telemetry, TelemetryConfig};
use node_runtime::{NodeConfig, NodeRuntime};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    init_telemetry(&TelemetryConfig::for_service("pixel-canvas-node"))
        .context("failed to initialize telemetry")?;

    let config = NodeConfig::load().context("invalid configuration")?;
    if config.pricing.receiver_address.is_none() {
        warn!("RECEIVER_ADDRESS is not set; purchases will be rejected");
    }
    if !config.verification.enabled {
        warn!("VERIFY_TRANSACTIONS is off; purchases are credited without confirmation");
    }

    let runtime = NodeRuntime::from_config(config).context("failed to initialize node")?;
    runtime.start().await.context("failed to start node")?;

    info!("Node is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl+C")?;

    runtime.shutdown().await;
    Ok(())
}
