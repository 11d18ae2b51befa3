//! Kaspa REST finality oracle
//!
//! On the first query for a transaction the DAG tip becomes its scan cursor.
//! Every query then walks `/blocks?lowHash={cursor}` and moves the cursor to
//! the newest block returned, so each poll only scans blocks added since the
//! previous one.
//!
//! Reconciliation cannot rely on a cursor, so [`FinalityOracle::lookup`]
//! asks `/transactions/{id}` directly.

use crate::error::OracleError;
use crate::ports::outbound::{FinalityOracle, OracleStatus};
use async_trait::async_trait;
use dashmap::DashMap;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use shared_types::TransactionId;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlockDagInfo {
    #[serde(default)]
    tip_hashes: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlocksPage {
    #[serde(default)]
    block_hashes: Vec<String>,
    #[serde(default)]
    blocks: Vec<Block>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Block {
    hash: Option<String>,
    verbose_data: Option<BlockVerboseData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlockVerboseData {
    hash: Option<String>,
    #[serde(default)]
    transaction_ids: Vec<String>,
    block_height: Option<serde_json::Value>,
}

/// `/transactions/{id}` body. This endpoint uses snake_case.
#[derive(Debug, Deserialize)]
struct TransactionRecord {
    #[serde(default)]
    block_hash: Vec<String>,
    is_accepted: Option<bool>,
    accepting_block_hash: Option<String>,
    accepting_block_blue_score: Option<u64>,
}

pub struct KaspaRestOracle {
    client: Client,
    base_url: String,
    cursors: DashMap<TransactionId, String>,
}

impl KaspaRestOracle {
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> Result<Self, OracleError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| OracleError::Unavailable {
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            cursors: DashMap::new(),
        })
    }

    async fn send(&self, path: &str, query: &[(&str, &str)]) -> Result<Response, OracleError> {
        let url = format!("{}{}", self.base_url, path);
        self.client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| OracleError::Unavailable {
                reason: e.to_string(),
            })
    }

    async fn decode<T: serde::de::DeserializeOwned>(
        path: &str,
        response: Response,
    ) -> Result<T, OracleError> {
        let status = response.status();
        if !status.is_success() {
            return Err(OracleError::Unavailable {
                reason: format!("{path} returned {status}"),
            });
        }

        response
            .json()
            .await
            .map_err(|e| OracleError::InvalidResponse {
                reason: e.to_string(),
            })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, OracleError> {
        let response = self.send(path, query).await?;
        Self::decode(path, response).await
    }

    async fn tip_hash(&self) -> Result<String, OracleError> {
        let info: BlockDagInfo = self.get_json("/info/blockdag", &[]).await?;
        info.tip_hashes
            .into_iter()
            .next()
            .ok_or_else(|| OracleError::InvalidResponse {
                reason: "blockdag info has no tip hashes".into(),
            })
    }
}

#[async_trait]
impl FinalityOracle for KaspaRestOracle {
    async fn check(&self, transaction_id: &TransactionId) -> Result<OracleStatus, OracleError> {
        let cached = self
            .cursors
            .get(transaction_id)
            .map(|c| c.value().clone());
        let cursor = match cached {
            Some(cursor) => cursor,
            None => {
                let tip = self.tip_hash().await?;
                self.cursors.insert(transaction_id.clone(), tip.clone());
                tip
            }
        };

        let page: BlocksPage = self
            .get_json(
                "/blocks",
                &[("lowHash", cursor.as_str()), ("includeBlocks", "true")],
            )
            .await?;

        if let Some(newest) = page.block_hashes.last() {
            self.cursors
                .insert(transaction_id.clone(), newest.clone());
        }

        debug!(
            tx_id = %transaction_id,
            blocks = page.blocks.len(),
            "Scanned blocks for transaction"
        );

        for block in page.blocks {
            let Some(verbose) = block.verbose_data else {
                continue;
            };
            if verbose
                .transaction_ids
                .iter()
                .any(|id| id == transaction_id.as_str())
            {
                let block_height = verbose.block_height.as_ref().and_then(|v| {
                    v.as_u64()
                        .or_else(|| v.as_str().and_then(|s| s.parse().ok()))
                });
                return Ok(OracleStatus::Confirmed {
                    block_hash: block.hash.or(verbose.hash).unwrap_or_default(),
                    block_height,
                });
            }
        }

        Ok(OracleStatus::NotSeen)
    }

    async fn lookup(&self, transaction_id: &TransactionId) -> Result<OracleStatus, OracleError> {
        let path = format!("/transactions/{}", transaction_id.as_str());
        let response = self
            .send(&path, &[("resolve_previous_outpoints", "no")])
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(OracleStatus::NotSeen);
        }

        let record: TransactionRecord = Self::decode(&path, response).await?;
        debug!(
            tx_id = %transaction_id,
            blocks = record.block_hash.len(),
            accepted = ?record.is_accepted,
            "Looked up transaction"
        );

        let block_hash = record
            .block_hash
            .into_iter()
            .next()
            .or(record.accepting_block_hash);
        match block_hash {
            Some(block_hash) if record.is_accepted != Some(false) => Ok(OracleStatus::Confirmed {
                block_hash,
                block_height: record.accepting_block_blue_score,
            }),
            _ => Ok(OracleStatus::NotSeen),
        }
    }

    fn forget(&self, transaction_id: &TransactionId) {
        self.cursors.remove(transaction_id);
    }
}
