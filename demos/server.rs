//! Simple REST API server example for the stock reservation engine.
//!
//! Run with: `cargo run --example server`
//!
//! ## Endpoints
//!
//! - `POST /products` - Create a stock record
//! - `GET /products` - List availability for all products
//! - `GET /products/{id}` - Get a stock record
//! - `POST /products/{id}/adjust` - Change on-hand quantity
//! - `POST /products/{id}/discontinue` - Mark a product discontinued
//! - `GET /products/{id}/availability?quantity=N` - Pre-checkout check
//! - `POST /reservations` - Hold stock for an order
//! - `GET /reservations/{id}` - Get a reservation
//! - `POST /reservations/{id}/commit` - Payment confirmed
//! - `POST /reservations/{id}/release` - Order cancelled
//! - `POST /sweep` - Expire elapsed holds now
//!
//! ## Configuration
//!
//! `STOCK_TTL_SECS` and `STOCK_SWEEP_INTERVAL_SECS` override the defaults.
//!
//! ## Example Usage
//!
//! ```bash
//! # Create
//! curl -X POST http://localhost:3000/products \
//!   -H "Content-Type: application/json" \
//!   -d '{"product_id": 1, "quantity": 10, "threshold_min": 3, "threshold_max": 50}'
//!
//! # Reserve
//! curl -X POST http://localhost:3000/reservations \
//!   -H "Content-Type: application/json" \
//!   -d '{"product_id": 1, "order_id": 100, "quantity": 4}'
//!
//! # Commit
//! curl -X POST http://localhost:3000/reservations/1/commit
//!
//! # Check availability
//! curl "http://localhost:3000/products/1/availability?quantity=5"
//! ```

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use stock_reservation_rs::{
    Availability, EngineConfig, LoggingAlertDispatcher, NewStock, OrderId, ProductId, Reservation,
    ReservationId, StockEngine, StockError, StockRecord, StockSummary, SweepOutcome, SystemClock,
};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

// === Request/Response DTOs ===

/// Request body for creating a stock record.
///
/// ```json
/// {"product_id": 1, "quantity": 10, "threshold_min": 3, "threshold_max": 50}
/// ```
#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    product_id: u32,
    quantity: i64,
    threshold_min: i64,
    threshold_max: i64,
    unit: Option<String>,
    location: Option<String>,
    supplier_ref: Option<String>,
}

impl CreateProductRequest {
    fn into_new_stock(self) -> NewStock {
        let mut new = NewStock::new(
            ProductId(self.product_id),
            self.quantity,
            self.threshold_min,
            self.threshold_max,
        );
        if let Some(unit) = self.unit {
            new = new.unit(unit);
        }
        if let Some(location) = self.location {
            new = new.location(location);
        }
        if let Some(supplier_ref) = self.supplier_ref {
            new = new.supplier_ref(supplier_ref);
        }
        new
    }
}

#[derive(Debug, Deserialize)]
pub struct AdjustRequest {
    delta: i64,
    reason: String,
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    quantity: i64,
}

/// Request body for holding stock. `ttl_secs` falls back to the engine default.
#[derive(Debug, Deserialize)]
pub struct ReserveRequest {
    product_id: u32,
    order_id: u32,
    quantity: i64,
    ttl_secs: Option<i64>,
}

/// Response body for errors.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

// === Application State ===

/// Shared application state containing the stock engine.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<StockEngine>,
}

// === Error Handling ===

/// Wrapper for converting `StockError` into HTTP responses.
pub struct AppError(StockError);

impl From<StockError> for AppError {
    fn from(err: StockError) -> Self {
        AppError(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self.0 {
            StockError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            StockError::InsufficientStock { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "INSUFFICIENT_STOCK")
            }
            StockError::ProductNotFound => (StatusCode::NOT_FOUND, "PRODUCT_NOT_FOUND"),
            StockError::ReservationNotFound => (StatusCode::NOT_FOUND, "RESERVATION_NOT_FOUND"),
            StockError::DuplicateProduct => (StatusCode::CONFLICT, "DUPLICATE_PRODUCT"),
            StockError::AlreadyReserved => (StatusCode::CONFLICT, "ALREADY_RESERVED"),
            StockError::InvalidStateTransition { .. } => {
                (StatusCode::CONFLICT, "INVALID_STATE_TRANSITION")
            }
            StockError::Expired => (StatusCode::CONFLICT, "RESERVATION_EXPIRED"),
            StockError::Discontinued => (StatusCode::UNPROCESSABLE_ENTITY, "DISCONTINUED"),
        };

        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
                code: code.to_string(),
            }),
        )
            .into_response()
    }
}

// === Handlers ===

/// POST /products - Create a stock record.
async fn create_product(
    State(state): State<AppState>,
    Json(request): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<StockRecord>), AppError> {
    let record = state.engine.create(request.into_new_stock())?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /products - Availability for every product.
async fn list_products(State(state): State<AppState>) -> Json<Vec<StockSummary>> {
    Json(state.engine.summaries())
}

/// GET /products/{id} - Get a stock record.
async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<u32>,
) -> Result<Json<StockRecord>, AppError> {
    Ok(Json(state.engine.get(ProductId(id))?))
}

/// POST /products/{id}/adjust - Change on-hand quantity.
async fn adjust_product(
    State(state): State<AppState>,
    Path(id): Path<u32>,
    Json(request): Json<AdjustRequest>,
) -> Result<Json<StockRecord>, AppError> {
    let record = state
        .engine
        .adjust_quantity(ProductId(id), request.delta, &request.reason)?;
    Ok(Json(record))
}

/// POST /products/{id}/discontinue - Stop accepting holds.
async fn discontinue_product(
    State(state): State<AppState>,
    Path(id): Path<u32>,
) -> Result<Json<StockRecord>, AppError> {
    Ok(Json(state.engine.mark_discontinued(ProductId(id))?))
}

/// GET /products/{id}/availability?quantity=N - Pre-checkout check.
async fn check_availability(
    State(state): State<AppState>,
    Path(id): Path<u32>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<Availability>, AppError> {
    let availability = state
        .engine
        .check_availability(ProductId(id), query.quantity)?;
    Ok(Json(availability))
}

/// POST /reservations - Hold stock for an order.
async fn create_reservation(
    State(state): State<AppState>,
    Json(request): Json<ReserveRequest>,
) -> Result<(StatusCode, Json<Reservation>), AppError> {
    let product_id = ProductId(request.product_id);
    let order_id = OrderId(request.order_id);
    let reservation = match request.ttl_secs {
        Some(secs) => state.engine.reserve_with_ttl(
            product_id,
            request.quantity,
            order_id,
            chrono::Duration::seconds(secs),
        )?,
        None => state
            .engine
            .reserve(product_id, request.quantity, order_id)?,
    };
    Ok((StatusCode::CREATED, Json(reservation)))
}

/// GET /reservations/{id} - Get a reservation.
async fn get_reservation(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<Reservation>, AppError> {
    Ok(Json(state.engine.reservation(ReservationId(id))?))
}

/// POST /reservations/{id}/commit - Deduct the hold from on-hand.
async fn commit_reservation(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<Reservation>, AppError> {
    Ok(Json(state.engine.commit(ReservationId(id))?))
}

/// POST /reservations/{id}/release - Return the hold.
async fn release_reservation(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<Reservation>, AppError> {
    Ok(Json(state.engine.release(ReservationId(id))?))
}

/// POST /sweep - Expire elapsed holds across all products.
async fn sweep(State(state): State<AppState>) -> Json<SweepOutcome> {
    Json(state.engine.sweep(None))
}

// === Router ===

fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/products", get(list_products).post(create_product))
        .route("/products/{id}", get(get_product))
        .route("/products/{id}/adjust", post(adjust_product))
        .route("/products/{id}/discontinue", post(discontinue_product))
        .route("/products/{id}/availability", get(check_availability))
        .route("/reservations", post(create_reservation))
        .route("/reservations/{id}", get(get_reservation))
        .route("/reservations/{id}/commit", post(commit_reservation))
        .route("/reservations/{id}/release", post(release_reservation))
        .route("/sweep", post(sweep))
        .with_state(state)
}

// === Main ===

fn env_secs(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = EngineConfig {
        reservation_ttl_secs: env_secs("STOCK_TTL_SECS", EngineConfig::DEFAULT_RESERVATION_TTL_SECS),
        sweep_interval_secs: env_secs(
            "STOCK_SWEEP_INTERVAL_SECS",
            EngineConfig::DEFAULT_SWEEP_INTERVAL_SECS,
        ),
        reservation_retention_secs: env_secs(
            "STOCK_RETENTION_SECS",
            EngineConfig::DEFAULT_RESERVATION_RETENTION_SECS,
        ),
    };
    let engine = StockEngine::with_parts(
        config,
        Arc::new(SystemClock),
        Arc::new(LoggingAlertDispatcher),
    )
    .unwrap();
    let sweeper = engine.spawn_sweeper().unwrap();

    let state = AppState {
        engine: Arc::new(engine),
    };
    let app = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:3000").await.unwrap();
    info!("Stock API server running on http://127.0.0.1:3000");
    println!();
    println!("Endpoints:");
    println!("  POST /products                        - Create a stock record");
    println!("  GET  /products                        - List availability");
    println!("  POST /products/{{id}}/adjust            - Change on-hand");
    println!("  POST /products/{{id}}/discontinue       - Discontinue");
    println!("  GET  /products/{{id}}/availability?quantity=N");
    println!("  POST /reservations                    - Hold stock");
    println!("  POST /reservations/{{id}}/commit        - Commit a hold");
    println!("  POST /reservations/{{id}}/release       - Release a hold");
    println!("  POST /sweep                           - Expire elapsed holds");

    axum::serve(listener, app).await.unwrap();
    sweeper.stop();
}
