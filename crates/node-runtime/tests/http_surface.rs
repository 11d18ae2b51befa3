//! # HTTP Surface Tests
//!
//! A full node on an ephemeral port, driven with plain HTTP requests the way
//! a browser front end drives it.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use node_runtime::adapters::NodeStore;
use node_runtime::{NodeConfig, NodeRuntime, SubsystemContainer};
use pc_03_payment_verification::{FinalityOracle, OracleError, OracleStatus};
use serde_json::{json, Value};
use shared_types::TransactionId;

/// Confirms every transaction on the first check.
struct InstantOracle;

#[async_trait]
impl FinalityOracle for InstantOracle {
    async fn check(&self, transaction_id: &TransactionId) -> Result<OracleStatus, OracleError> {
        Ok(OracleStatus::Confirmed {
            block_hash: format!("block-{transaction_id}"),
            block_height: Some(7),
        })
    }
}

async fn start_node() -> (NodeRuntime<InstantOracle>, String) {
    let container = SubsystemContainer::new(
        NodeConfig::for_testing(),
        NodeStore::in_memory(),
        Arc::new(InstantOracle),
    );
    let runtime = NodeRuntime::new(container);
    let addr = runtime.start().await.unwrap();
    (runtime, format!("http://{addr}"))
}

async fn get_json(client: &reqwest::Client, url: String) -> (u16, Value) {
    let response = client.get(url).send().await.unwrap();
    let status = response.status().as_u16();
    (status, response.json().await.unwrap())
}

async fn post_json(client: &reqwest::Client, url: String, body: Value) -> (u16, Value) {
    let response = client.post(url).json(&body).send().await.unwrap();
    let status = response.status().as_u16();
    (status, response.json().await.unwrap())
}

#[tokio::test]
async fn test_write_denied_without_credit() {
    let (runtime, base) = start_node().await;
    let client = reqwest::Client::new();

    let (status, body) = post_json(
        &client,
        format!("{base}/api/v1/pixels"),
        json!({
            "x": 5, "y": 5, "color": "#FF0000",
            "wallet_address": "kaspa:alice", "transaction_id": "w-1"
        }),
    )
    .await;
    assert_eq!(status, 403);
    assert_eq!(body["code"], "INSUFFICIENT_CREDIT");

    let (_, pixels) = get_json(&client, format!("{base}/api/v1/pixels")).await;
    assert_eq!(pixels, json!([]));

    runtime.shutdown().await;
}

#[tokio::test]
async fn test_purchase_then_write() {
    let (runtime, base) = start_node().await;
    let client = reqwest::Client::new();

    let (status, body) = post_json(
        &client,
        format!("{base}/api/v1/purchases"),
        json!({
            "wallet_address": "kaspa:alice",
            "transaction_id": "\"pay-1\"",
            "amount_sompi": 20_000_000u64
        }),
    )
    .await;
    assert!(status == 202 || status == 200, "unexpected status {status}");
    assert_eq!(body["estimated_pixels"], 10);

    let mut verified = false;
    for _ in 0..100 {
        let (_, verify) =
            get_json(&client, format!("{base}/api/v1/transactions/pay-1/verify")).await;
        if verify["verified"] == json!(true) {
            assert_eq!(verify["block_hash"], "block-pay-1");
            verified = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert!(verified, "payment never verified");

    let (_, balance) = get_json(
        &client,
        format!("{base}/api/v1/wallets/kaspa:alice/balance"),
    )
    .await;
    assert_eq!(balance["pixel_balance"], 10);

    let (status, placed) = post_json(
        &client,
        format!("{base}/api/v1/pixels"),
        json!({
            "x": 1, "y": 2, "color": "#00ff00",
            "wallet_address": "kaspa:alice", "transaction_id": "w-1"
        }),
    )
    .await;
    assert_eq!(status, 201);
    assert_eq!(placed["remaining_balance"], 9);

    let (_, canvas) = get_json(&client, format!("{base}/api/v1/canvas")).await;
    assert_eq!(canvas["canvas_state"]["1,2"], "#00FF00");
    assert_eq!(canvas["revision"], 1);

    runtime.shutdown().await;
}

#[tokio::test]
async fn test_config_exposes_client_subset() {
    let (runtime, base) = start_node().await;
    let client = reqwest::Client::new();

    let (status, config) = get_json(&client, format!("{base}/api/v1/config")).await;
    assert_eq!(status, 200);
    assert_eq!(config["canvas_width"], 16);
    assert_eq!(config["pixel_pack_size"], 10);
    assert_eq!(config["receiver_address"], "kaspa:receiver");

    runtime.shutdown().await;
}
