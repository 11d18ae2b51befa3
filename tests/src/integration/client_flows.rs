//! # Client Flows Over A Live Node
//!
//! A node runtime bound to an ephemeral port, driven by client engines over
//! HTTP and the broadcast stream.
//!
//! ## Flows Tested
//!
//! 1. **Convergence**: clients with stale views agree on the last accepted
//!    write once the deltas arrive
//! 2. **Purchase**: payment submission, verification mirror and balance
//!    reconciliation end with spendable credit
//! 3. **Denial**: a write without credit is shown, refused and rolled back

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use pc_01_canvas_store::CanvasStoreApi;
    use pc_02_credit_ledger::CreditLedgerApi;
    use pc_04_client_sync::{
        BroadcastClient, CanvasApi, ClientEngine, ClientError, ClientEvent, ClientTimingConfig,
        HttpCanvasApi, WatchStop,
    };
    use shared_types::{CanvasDimensions, Color, Coord, Identity, PaymentState, TransactionId};
    use tokio::sync::mpsc;

    use crate::fixtures::{eventually, ConfirmAt, TestNode};

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    type Engine = ClientEngine<HttpCanvasApi>;

    struct ConnectedClient {
        engine: Arc<Engine>,
        events: mpsc::UnboundedReceiver<ClientEvent>,
    }

    /// Engine synced over HTTP with its broadcast stream pumped into it.
    async fn connect(node: &TestNode, wallet: &str) -> ConnectedClient {
        let api = HttpCanvasApi::new(node.base_url(), Duration::from_secs(5)).unwrap();
        let server = api.config().await.unwrap();
        let stream_url = api.stream_url();

        let mut timing = ClientTimingConfig::from_server(&server);
        let fast = ClientTimingConfig::for_testing();
        timing.ticker_interval = fast.ticker_interval;
        timing.heartbeat_interval = fast.heartbeat_interval;
        timing.silence_timeout = Duration::from_secs(5);
        timing.reconnect_initial = fast.reconnect_initial;
        timing.reconnect_max = fast.reconnect_max;

        let (engine, events) = ClientEngine::new(
            Arc::new(api),
            Identity::new(wallet).unwrap(),
            CanvasDimensions::new(server.canvas_width, server.canvas_height),
            timing.clone(),
        );
        let engine = Arc::new(engine);
        engine.sync().await.unwrap();

        let (tx, mut rx) = mpsc::channel(64);
        tokio::spawn(BroadcastClient::new(stream_url, timing).run(engine.shutdown_token(), tx));
        let pump = Arc::clone(&engine);
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                pump.on_stream_event(event);
            }
        });

        ConnectedClient { engine, events }
    }

    async fn fund(node: &TestNode, wallet: &str, tx: &str, units: u64) {
        node.runtime
            .container()
            .ledger
            .credit(
                &Identity::new(wallet).unwrap(),
                &TransactionId::parse(tx).unwrap(),
                units,
            )
            .await
            .unwrap();
    }

    async fn wait_connected(client: &mut ConnectedClient) {
        let connected = tokio::time::timeout(Duration::from_secs(5), async {
            while let Some(event) = client.events.recv().await {
                if event == ClientEvent::StreamConnected {
                    return true;
                }
            }
            false
        })
        .await;
        assert_eq!(connected, Ok(true), "broadcast stream never connected");
    }

    // =============================================================================
    // CONVERGENCE
    // =============================================================================

    #[tokio::test]
    async fn test_stale_clients_converge_on_last_accepted_write() {
        let node = TestNode::start(ConfirmAt::Check(1)).await;
        fund(&node, "kaspa:alice", "seed-a", 1).await;
        fund(&node, "kaspa:bob", "seed-b", 1).await;
        fund(&node, "kaspa:carol", "seed-c", 1).await;

        let mut alice = connect(&node, "kaspa:alice").await;
        let mut bob = connect(&node, "kaspa:bob").await;
        let mut observer = connect(&node, "kaspa:carol").await;
        wait_connected(&mut alice).await;
        wait_connected(&mut bob).await;
        wait_connected(&mut observer).await;

        let origin = Coord::new(0, 0);
        let red = Color::parse("#FF0000").unwrap();
        let blue = Color::parse("#0000FF").unwrap();

        // Both writers see an empty cell when they write.
        let first = alice.engine.place(origin, red).await.unwrap();
        let second = bob.engine.place(origin, blue).await.unwrap();
        assert!(second.pixel.revision > first.pixel.revision);

        for client in [&alice, &bob, &observer] {
            let engine = Arc::clone(&client.engine);
            let converged = eventually(Duration::from_secs(5), || {
                engine.view(origin) == Some(blue) && engine.revision() >= second.pixel.revision
            })
            .await;
            assert!(converged, "{} never saw the last write", engine.identity());
            assert_eq!(engine.pending_writes(), 0);
        }

        for client in [alice, bob, observer] {
            client.engine.shutdown();
        }
        node.stop().await;
    }

    #[tokio::test]
    async fn test_write_without_credit_rolls_back() {
        let node = TestNode::start(ConfirmAt::Check(1)).await;
        let mut client = connect(&node, "kaspa:broke").await;
        wait_connected(&mut client).await;

        let coord = Coord::new(5, 5);
        let result = client
            .engine
            .place(coord, Color::parse("#FF0000").unwrap())
            .await;

        assert_eq!(result, Err(ClientError::InsufficientCredit { balance: 0 }));
        assert_eq!(client.engine.view(coord), None);
        assert_eq!(client.engine.pending_writes(), 0);
        assert_eq!(client.engine.available_credit(), 0);

        let mut saw_rollback = false;
        let mut saw_out_of_credit = false;
        while let Ok(event) = client.events.try_recv() {
            match event {
                ClientEvent::WriteRolledBack { .. } => saw_rollback = true,
                ClientEvent::OutOfCredit { balance } => {
                    assert_eq!(balance, 0);
                    saw_out_of_credit = true;
                }
                _ => {}
            }
        }
        assert!(saw_rollback && saw_out_of_credit);
        assert!(node.runtime.container().canvas.snapshot().cells.is_empty());

        client.engine.shutdown();
        node.stop().await;
    }

    // =============================================================================
    // PURCHASE
    // =============================================================================

    #[tokio::test]
    async fn test_purchase_over_http_funds_writes() {
        let node = TestNode::start(ConfirmAt::Check(2)).await;
        let mut client = connect(&node, "kaspa:buyer").await;
        wait_connected(&mut client).await;

        let session = client
            .engine
            .purchase(TransactionId::parse("pay-e2e").unwrap(), 20_000_000)
            .await
            .unwrap();
        assert_eq!(session.response.estimated_pixels, 10);

        let outcome = tokio::time::timeout(Duration::from_secs(10), session.outcome())
            .await
            .expect("purchase settled in time")
            .unwrap();

        assert_eq!(outcome.verification.state, PaymentState::Confirmed);
        assert!(outcome.verification.verified);
        assert_eq!(outcome.verification.poll_count, 2);
        assert_eq!(outcome.balance.reason, WatchStop::Reached);
        assert_eq!(outcome.balance.balance, 10);
        assert_eq!(client.engine.available_credit(), 10);

        let coord = Coord::new(2, 3);
        let placed = client
            .engine
            .place(coord, Color::parse("#00FF00").unwrap())
            .await
            .unwrap();
        assert_eq!(placed.remaining_balance, 9);
        assert_eq!(client.engine.view(coord), Some(Color::parse("#00FF00").unwrap()));

        client.engine.shutdown();
        node.stop().await;
    }
}
