//! Driven Ports (SPI - Outbound Dependencies)
//!
//! Production adapter: [`crate::adapters::HttpCanvasApi`]

use crate::error::ClientResult;
use async_trait::async_trait;
use shared_types::{
    CanvasSnapshot, ClientConfig, Identity, PlacePixelRequest, PlacePixelResponse,
    PurchaseRequest, PurchaseResponse, TransactionId, VerifyResponse,
};

/// The server's HTTP surface as seen by one client.
#[async_trait]
pub trait CanvasApi: Send + Sync {
    async fn config(&self) -> ClientResult<ClientConfig>;

    async fn snapshot(&self) -> ClientResult<CanvasSnapshot>;

    async fn place(&self, request: PlacePixelRequest) -> ClientResult<PlacePixelResponse>;

    async fn balance(&self, identity: &Identity) -> ClientResult<u64>;

    async fn purchase(&self, request: PurchaseRequest) -> ClientResult<PurchaseResponse>;

    async fn verify(&self, transaction_id: &TransactionId) -> ClientResult<VerifyResponse>;
}
