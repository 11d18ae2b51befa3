//! REST routes under `/api/v1` plus `/health`, `/metrics` and `/ws`.

use crate::domain::views::{canvas_state, purchase_response, verify_response};
use crate::domain::GatewayConfig;
use crate::error::{GatewayError, GatewayResult, SUBSYSTEM};
use crate::ports::outbound::{AdmissionApi, CanvasReader, CreditLedgerApi, VerificationApi};
use crate::ws;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use canvas_telemetry::log_cell_event;
use pc_02_credit_ledger::WriteRequest;
use pc_03_payment_verification::PaymentRequest;
use serde::Deserialize;
use shared_bus::InMemoryEventBus;
use shared_types::{
    BalanceResponse, Cell, ClientConfig, Color, Coord, HealthResponse, Identity, MetricsResponse,
    PaymentState, PlacePixelRequest, PlacePixelResponse, PurchaseRequest, TransactionId,
    VerifyResponse, WriteId,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Stream timing handed to each WebSocket connection.
#[derive(Debug, Clone, Copy)]
pub struct StreamSettings {
    pub ping_interval: Duration,
    pub idle_timeout: Duration,
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct GatewayState {
    pub admission: Arc<dyn AdmissionApi>,
    pub ledger: Arc<dyn CreditLedgerApi>,
    pub verification: Arc<dyn VerificationApi>,
    pub canvas: Arc<dyn CanvasReader>,
    pub bus: Arc<InMemoryEventBus>,
    pub client_config: Arc<ClientConfig>,
    pub stream: StreamSettings,
    /// Closes open streams on shutdown.
    pub shutdown: CancellationToken,
}

/// Build the full router.
pub fn build_router(state: GatewayState, config: &GatewayConfig) -> Router {
    let api = Router::new()
        .route("/pixels", get(list_pixels).post(place_pixel))
        .route("/canvas", get(get_canvas))
        .route("/wallets/:address/balance", get(get_balance))
        .route("/purchases", post(submit_purchase))
        .route("/transactions/metrics", get(get_metrics))
        .route("/transactions/:id/verify", get(verify_transaction))
        .route("/transactions/:id/reconcile", post(reconcile_transaction))
        .route("/config", get(get_config))
        .layer(TimeoutLayer::new(config.request_timeout));

    let middleware = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(create_cors_layer(config));

    Router::new()
        .nest("/api/v1", api)
        .route("/health", get(health_check))
        .route("/metrics", get(prometheus_metrics))
        .route("/ws", get(ws::stream_upgrade))
        .layer(middleware)
        .with_state(state)
}

fn create_cors_layer(config: &GatewayConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    if config.cors_allow_any {
        return cors.allow_origin(Any);
    }
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();
    cors.allow_origin(origins)
}

fn bad_json(rejection: JsonRejection) -> GatewayError {
    GatewayError::BadRequest {
        code: "INVALID_REQUEST",
        message: rejection.body_text(),
    }
}

fn parse_transaction_id(raw: &str) -> GatewayResult<TransactionId> {
    Ok(TransactionId::parse(raw)?)
}

// =============================================================================
// Canvas
// =============================================================================

async fn place_pixel(
    State(state): State<GatewayState>,
    payload: Result<Json<PlacePixelRequest>, JsonRejection>,
) -> GatewayResult<(StatusCode, Json<PlacePixelResponse>)> {
    let Json(body) = payload.map_err(bad_json)?;
    let request = WriteRequest {
        coord: Coord::new(body.x, body.y),
        color: Color::parse(&body.color)?,
        identity: Identity::new(body.wallet_address)?,
        write_id: WriteId::new(body.transaction_id)?,
    };

    let receipt = state.admission.write(request).await?;
    log_cell_event!(
        debug,
        SUBSYSTEM,
        "Pixel write answered",
        receipt.cell.x,
        receipt.cell.y,
        revision = receipt.cell.revision,
        replayed = receipt.replayed
    );

    let message = if receipt.replayed {
        "Pixel already placed"
    } else {
        "Pixel placed"
    };
    Ok((
        StatusCode::CREATED,
        Json(PlacePixelResponse {
            message: message.to_string(),
            pixel: receipt.cell,
            remaining_balance: receipt.remaining_balance,
        }),
    ))
}

async fn list_pixels(State(state): State<GatewayState>) -> Json<Vec<Cell>> {
    Json(state.canvas.snapshot().cells)
}

async fn get_canvas(State(state): State<GatewayState>) -> impl IntoResponse {
    Json(canvas_state(&state.canvas.snapshot()))
}

// =============================================================================
// Credits and payments
// =============================================================================

async fn get_balance(
    State(state): State<GatewayState>,
    Path(address): Path<String>,
) -> GatewayResult<Json<BalanceResponse>> {
    let identity = Identity::new(address)?;
    Ok(Json(BalanceResponse {
        pixel_balance: state.ledger.balance_of(&identity),
        wallet_address: identity.to_string(),
    }))
}

async fn submit_purchase(
    State(state): State<GatewayState>,
    payload: Result<Json<PurchaseRequest>, JsonRejection>,
) -> GatewayResult<impl IntoResponse> {
    let Json(body) = payload.map_err(bad_json)?;
    let request = PaymentRequest {
        transaction_id: parse_transaction_id(&body.transaction_id)?,
        identity: Identity::new(body.wallet_address)?,
        amount_sompi: body.amount_sompi,
    };

    let outcome = state.verification.submit(request).await?;
    let status = match outcome.payment.state {
        PaymentState::Submitted | PaymentState::Polling => StatusCode::ACCEPTED,
        _ => StatusCode::OK,
    };
    Ok((
        status,
        Json(purchase_response(
            &outcome.payment,
            outcome.current_balance,
            outcome.started,
        )),
    ))
}

async fn verify_transaction(
    State(state): State<GatewayState>,
    Path(raw): Path<String>,
) -> GatewayResult<Json<VerifyResponse>> {
    let transaction_id = parse_transaction_id(&raw)?;
    let payment = state
        .verification
        .status(&transaction_id)
        .ok_or_else(|| GatewayError::NotFound(format!("Unknown transaction {transaction_id}")))?;
    let fastest = state.verification.summary().fastest_time;
    Ok(Json(verify_response(&payment, fastest)))
}

async fn reconcile_transaction(
    State(state): State<GatewayState>,
    Path(raw): Path<String>,
) -> GatewayResult<Json<VerifyResponse>> {
    let transaction_id = parse_transaction_id(&raw)?;
    let payment = state.verification.reconcile(&transaction_id).await?;
    let fastest = state.verification.summary().fastest_time;
    Ok(Json(verify_response(&payment, fastest)))
}

#[derive(Debug, Deserialize)]
struct MetricsQuery {
    transaction_id: Option<String>,
}

async fn get_metrics(
    State(state): State<GatewayState>,
    Query(query): Query<MetricsQuery>,
) -> GatewayResult<Json<MetricsResponse>> {
    match query.transaction_id {
        Some(raw) => {
            let transaction_id = parse_transaction_id(&raw)?;
            let metrics = state
                .verification
                .transaction_metrics(&transaction_id)
                .ok_or_else(|| {
                    GatewayError::NotFound(format!("Unknown transaction {transaction_id}"))
                })?;
            Ok(Json(MetricsResponse::Transaction(metrics)))
        }
        None => Ok(Json(MetricsResponse::Summary(state.verification.summary()))),
    }
}

// =============================================================================
// Operational
// =============================================================================

async fn get_config(State(state): State<GatewayState>) -> Json<ClientConfig> {
    Json(state.client_config.as_ref().clone())
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

async fn prometheus_metrics() -> GatewayResult<impl IntoResponse> {
    let body =
        canvas_telemetry::encode_metrics().map_err(|e| GatewayError::Server(e.to_string()))?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    ))
}
