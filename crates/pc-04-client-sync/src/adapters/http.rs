//! HTTP adapter for [`CanvasApi`] over the server's `/api/v1` routes.

use crate::error::{ClientError, ClientResult};
use crate::ports::outbound::CanvasApi;
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use shared_types::{
    BalanceResponse, CanvasSnapshot, Cell, ClientConfig, ErrorBody, Identity, PlacePixelRequest,
    PlacePixelResponse, PurchaseRequest, PurchaseResponse, TransactionId, VerifyResponse,
};
use std::time::Duration;

/// Error code the gateway uses for coordinates outside the grid.
const OUT_OF_BOUNDS_CODE: &str = "OUT_OF_BOUNDS";

pub struct HttpCanvasApi {
    client: Client,
    base_url: String,
}

impl HttpCanvasApi {
    /// `base_url` is the server root, e.g. `http://127.0.0.1:3000`.
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .connect_timeout(Duration::from_secs(2))
            .build()
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// WebSocket URL of the broadcast stream on the same server.
    pub fn stream_url(&self) -> String {
        let ws_base = if let Some(rest) = self.base_url.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = self.base_url.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            self.base_url.clone()
        };
        format!("{ws_base}/ws")
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get<R: DeserializeOwned>(&self, path: &str) -> ClientResult<R> {
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .map_err(transport)?;
        decode(response).await
    }

    async fn post<B: serde::Serialize, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> ClientResult<R> {
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(transport)?;
        decode(response).await
    }
}

fn transport(e: reqwest::Error) -> ClientError {
    if e.is_connect() {
        ClientError::Transport(format!("cannot connect: {e}"))
    } else {
        ClientError::Transport(e.to_string())
    }
}

/// Decode a success body or turn the gateway's `{error, code}` into a typed error.
async fn decode<R: DeserializeOwned>(response: Response) -> ClientResult<R> {
    let status = response.status();
    if status.is_success() {
        return response
            .json()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()));
    }

    let body = response.json::<ErrorBody>().await.ok();
    let (code, message) = match body {
        Some(body) => (body.code, body.error),
        None => (String::new(), status.to_string()),
    };
    Err(ClientError::Rejected {
        status: status.as_u16(),
        code,
        message,
    })
}

#[async_trait]
impl CanvasApi for HttpCanvasApi {
    async fn config(&self) -> ClientResult<ClientConfig> {
        self.get("/api/v1/config").await
    }

    async fn snapshot(&self) -> ClientResult<CanvasSnapshot> {
        let cells: Vec<Cell> = self.get("/api/v1/pixels").await?;
        let revision = cells.iter().map(|c| c.revision).max().unwrap_or(0);
        Ok(CanvasSnapshot { revision, cells })
    }

    async fn place(&self, request: PlacePixelRequest) -> ClientResult<PlacePixelResponse> {
        let (x, y) = (request.x, request.y);
        match self.post("/api/v1/pixels", &request).await {
            Err(ClientError::Rejected { status, .. })
                if status == StatusCode::FORBIDDEN.as_u16() =>
            {
                Err(ClientError::InsufficientCredit { balance: 0 })
            }
            Err(ClientError::Rejected { code, .. }) if code == OUT_OF_BOUNDS_CODE => {
                Err(ClientError::OutOfBounds { x, y })
            }
            other => other,
        }
    }

    async fn balance(&self, identity: &Identity) -> ClientResult<u64> {
        let response: BalanceResponse = self
            .get(&format!("/api/v1/wallets/{}/balance", identity.as_str()))
            .await?;
        Ok(response.pixel_balance)
    }

    async fn purchase(&self, request: PurchaseRequest) -> ClientResult<PurchaseResponse> {
        self.post("/api/v1/purchases", &request).await
    }

    async fn verify(&self, transaction_id: &TransactionId) -> ClientResult<VerifyResponse> {
        self.get(&format!(
            "/api/v1/transactions/{}/verify",
            transaction_id.as_str()
        ))
        .await
    }
}
