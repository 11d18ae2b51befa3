//! Pixel Canvas command-line client.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use canvas_telemetry::{init_telemetry, TelemetryConfig};
use clap::Parser;
use pc_04_client_sync::{
    BroadcastClient, CanvasApi, ClientEngine, ClientEvent, ClientTimingConfig, HttpCanvasApi,
};
use pc_client::render::{describe, payment_state, stop_reason};
use pc_client::{Cli, Command};
use shared_types::{CanvasDimensions, Coord, Identity};
use tokio::sync::mpsc;
use tracing::debug;

type Engine = ClientEngine<HttpCanvasApi>;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_telemetry(&TelemetryConfig::for_service("pc-client"))
        .context("failed to initialize telemetry")?;

    let api = HttpCanvasApi::new(cli.server.clone(), cli.request_timeout())
        .context("failed to build HTTP client")?;
    let server = api
        .config()
        .await
        .with_context(|| format!("cannot reach {}", cli.server))?;
    debug!(?server, "Server configuration");

    let identity = Identity::new(cli.wallet.clone()).context("invalid wallet address")?;
    let stream_url = api.stream_url();
    let timing = ClientTimingConfig::from_server(&server);
    let (engine, events) = ClientEngine::new(
        Arc::new(api),
        identity,
        CanvasDimensions::new(server.canvas_width, server.canvas_height),
        timing.clone(),
    );
    let engine = Arc::new(engine);

    let result = match cli.command {
        Command::Watch => watch(&engine, events, stream_url, timing).await,
        Command::Place { x, y, color } => {
            engine.sync().await.context("initial sync failed")?;
            let response = engine.place(Coord::new(x, y), color).await?;
            println!(
                "{} ({} pixels left)",
                response.message, response.remaining_balance
            );
            Ok(())
        }
        Command::Buy {
            transaction,
            amount,
        } => {
            let amount = amount.unwrap_or(server.pixel_pack_cost_sompi);
            buy(&engine, events, transaction, amount).await
        }
        Command::Balance => {
            engine.sync().await.context("sync failed")?;
            println!("{}", engine.available_credit());
            Ok(())
        }
    };

    engine.shutdown();
    result
}

async fn watch(
    engine: &Arc<Engine>,
    mut events: mpsc::UnboundedReceiver<ClientEvent>,
    stream_url: String,
    timing: ClientTimingConfig,
) -> Result<()> {
    engine.sync().await.context("initial sync failed")?;

    let (tx, mut stream) = mpsc::channel(256);
    tokio::spawn(BroadcastClient::new(stream_url, timing).run(engine.shutdown_token(), tx));

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => return Ok(()),
            Some(event) = stream.recv() => engine.on_stream_event(event),
            Some(event) = events.recv() => {
                if let Some(line) = describe(&event) {
                    println!("{line}");
                }
            }
        }
    }
}

async fn buy(
    engine: &Arc<Engine>,
    mut events: mpsc::UnboundedReceiver<ClientEvent>,
    transaction: shared_types::TransactionId,
    amount_sompi: u64,
) -> Result<()> {
    let session = engine
        .purchase(transaction, amount_sompi)
        .await
        .context("payment submission failed")?;
    println!(
        "{} (expecting {} pixels)",
        session.response.message, session.response.estimated_pixels
    );

    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            if let ClientEvent::VerificationTick { elapsed, .. } = &event {
                debug!(elapsed_secs = elapsed.as_secs(), "Waiting for confirmation");
            } else if let Some(line) = describe(&event) {
                println!("{line}");
            }
        }
    });

    let outcome = session.outcome().await?;
    println!(
        "payment {}: {}",
        outcome.verification.transaction_id,
        payment_state(outcome.verification.state)
    );
    if outcome.balance.balance == 0 {
        bail!(
            "credit not visible yet ({})",
            stop_reason(outcome.balance.reason)
        );
    }
    println!("balance {}", outcome.balance.balance);
    Ok(())
}
