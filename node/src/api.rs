//! # REST API
//!
//! Builds the axum router that exposes the bank's public operation
//! surface over HTTP. All endpoints share application state through
//! axum's `State` extractor.
//!
//! ## Endpoints
//!
//! | Method | Path                        | Description                        |
//! |--------|-----------------------------|------------------------------------|
//! | GET    | `/health`                   | Liveness probe                     |
//! | GET    | `/status`                   | Node + bank status summary         |
//! | GET    | `/bank`                     | Limits, capacity, counters         |
//! | GET    | `/price`                    | Freshly validated oracle quote     |
//! | GET    | `/assets`                   | Registered assets, in order        |
//! | POST   | `/assets`                   | Register an asset (admin)          |
//! | DELETE | `/assets/:asset`            | Unregister an asset (admin)        |
//! | POST   | `/routes`                   | Configure a conversion route (admin)|
//! | GET    | `/balances/:owner`          | All non-zero balances of an owner  |
//! | GET    | `/balances/:owner/:asset`   | One balance                        |
//! | POST   | `/deposits/native`          | Native-currency deposit            |
//! | POST   | `/deposits/token`           | Registered-asset deposit           |
//! | POST   | `/deposits/convert`         | Swap-composed deposit              |
//! | POST   | `/withdrawals/native`       | Native-currency withdrawal         |
//! | POST   | `/withdrawals/token`        | Registered-asset withdrawal        |
//! | POST   | `/faucet`                   | Devnet faucet (sim transfers only) |
//!
//! Every failure response carries a machine-readable `code` alongside
//! the human-readable message, because "try again later" (stale price)
//! and "adjust your input" (slippage, capacity) deserve different
//! client reactions.

use axum::{
    extract::{Path, Query, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use aurum_bank::asset::{AssetId, RegistryError};
use aurum_bank::bank::{Bank, BankError};
use aurum_bank::exchange::ExchangeError;
use aurum_bank::ledger::{CapacityError, LedgerError};

use crate::metrics::SharedMetrics;
use crate::sim::SimTransferAgent;

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state available to all request handlers.
///
/// Cheap to clone -- everything heavy is behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// The node's reported version string.
    pub version: String,
    /// Network label (e.g., "devnet").
    pub network: String,
    /// The bank engine.
    pub bank: Arc<Bank>,
    /// Prometheus metrics for in-handler recording.
    pub metrics: SharedMetrics,
    /// Devnet faucet target; `None` on deployments with real transfers.
    pub faucet: Option<Arc<SimTransferAgent>>,
    /// When the node started (UTC).
    pub started_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full axum [`Router`] with all API routes, CORS, and
/// tracing. The returned router is ready to be served on the RPC port.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .route("/bank", get(bank_handler))
        .route("/price", get(price_handler))
        .route("/assets", get(assets_handler).post(register_asset_handler))
        .route("/assets/:asset", delete(unregister_asset_handler))
        .route("/routes", post(set_route_handler))
        .route("/balances/:owner", get(balances_handler))
        .route("/balances/:owner/:asset", get(balance_handler))
        .route("/deposits/native", post(deposit_native_handler))
        .route("/deposits/token", post(deposit_token_handler))
        .route("/deposits/convert", post(deposit_convert_handler))
        .route("/withdrawals/native", post(withdraw_native_handler))
        .route("/withdrawals/token", post(withdraw_token_handler))
        .route("/faucet", post(faucet_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Error Mapping
// ---------------------------------------------------------------------------

/// Generic error body returned by endpoints on failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Machine-readable reason code.
    pub code: String,
    /// Human-readable message.
    pub error: String,
}

/// API-level error: a status, a reason code, and a message.
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            code: self.code.to_string(),
            error: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<BankError> for ApiError {
    fn from(err: BankError) -> Self {
        let (status, code) = classify(&err);
        Self {
            status,
            code,
            message: err.to_string(),
        }
    }
}

/// Maps engine errors onto HTTP status + reason code. The split follows
/// the engine's error taxonomy: input problems are 400s, authorization
/// is 403, oracle trust failures are 503 (retry once the feed recovers),
/// and collaborator failures are 502.
fn classify(err: &BankError) -> (StatusCode, &'static str) {
    match err {
        BankError::ZeroAmount | BankError::DustAmount { .. } | BankError::Normalize(_) => {
            (StatusCode::BAD_REQUEST, "invalid_amount")
        }
        BankError::Unauthorized { .. } => (StatusCode::FORBIDDEN, "unauthorized"),
        BankError::OperationInFlight => (StatusCode::CONFLICT, "operation_in_flight"),
        BankError::UnsupportedAsset(_) | BankError::NativeViaTokenPath => {
            (StatusCode::BAD_REQUEST, "unsupported_asset")
        }
        BankError::Registry(RegistryError::AlreadyRegistered(_)) => {
            (StatusCode::CONFLICT, "already_registered")
        }
        BankError::Registry(RegistryError::NotRegistered(_)) => {
            (StatusCode::NOT_FOUND, "not_registered")
        }
        BankError::Registry(_) => (StatusCode::BAD_REQUEST, "invalid_asset"),
        BankError::Oracle(_) => (StatusCode::SERVICE_UNAVAILABLE, "price_unavailable"),
        BankError::Ledger(LedgerError::InsufficientBalance { .. }) => {
            (StatusCode::BAD_REQUEST, "insufficient_balance")
        }
        BankError::Ledger(_) => (StatusCode::INTERNAL_SERVER_ERROR, "ledger_error"),
        BankError::Capacity(CapacityError::DepositExceedsBankCap { .. }) => {
            (StatusCode::BAD_REQUEST, "bank_cap_exceeded")
        }
        BankError::Capacity(CapacityError::WithdrawalExceedsLimit { .. }) => {
            (StatusCode::BAD_REQUEST, "withdrawal_limit_exceeded")
        }
        BankError::Exchange(ExchangeError::SlippageTooHigh { .. }) => {
            (StatusCode::BAD_REQUEST, "slippage_too_high")
        }
        BankError::Exchange(ExchangeError::NoConversionRoute(_)) => {
            (StatusCode::BAD_REQUEST, "no_conversion_route")
        }
        BankError::Exchange(ExchangeError::DeadlineExpired { .. }) => {
            (StatusCode::BAD_REQUEST, "deadline_expired")
        }
        BankError::Exchange(ExchangeError::MalformedPath { .. }) => {
            (StatusCode::BAD_REQUEST, "malformed_path")
        }
        BankError::Exchange(_) => (StatusCode::BAD_GATEWAY, "venue_error"),
        BankError::Transfer(_) => (StatusCode::BAD_GATEWAY, "transfer_failed"),
    }
}

fn parse_asset(s: &str) -> Result<AssetId, ApiError> {
    s.parse()
        .map_err(|e: aurum_bank::asset::AssetIdParseError| {
            ApiError::bad_request("invalid_asset_id", e.to_string())
        })
}

// ---------------------------------------------------------------------------
// Request / Response Types
// ---------------------------------------------------------------------------

/// Response payload for `GET /status`.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Node software version.
    pub version: String,
    /// Network label.
    pub network: String,
    /// Aggregate canonical value held.
    pub total_value: u128,
    /// Remaining headroom under the bank cap.
    pub available_capacity: u128,
    /// Settlement asset id.
    pub settlement_asset: AssetId,
    /// Global deposit counter.
    pub deposits: u64,
    /// Global withdrawal counter.
    pub withdrawals: u64,
    /// Seconds since the node started.
    pub uptime_secs: i64,
    /// ISO-8601 timestamp of the response.
    pub timestamp: String,
}

/// Response payload for `GET /bank`.
#[derive(Debug, Serialize, Deserialize)]
pub struct BankResponse {
    /// Bank-wide capacity ceiling, canonical units.
    pub bank_cap: u128,
    /// Per-operation withdrawal ceiling, canonical units.
    pub withdrawal_ceiling: u128,
    /// Aggregate canonical value held.
    pub total_value: u128,
    /// Remaining headroom under the cap.
    pub available_capacity: u128,
    /// Global deposit counter.
    pub deposits: u64,
    /// Global withdrawal counter.
    pub withdrawals: u64,
}

/// One asset entry in `GET /assets`.
#[derive(Debug, Serialize, Deserialize)]
pub struct AssetEntry {
    /// The asset id.
    pub asset: AssetId,
    /// Native fractional digits.
    pub decimals: u8,
    /// Whether deposits are currently accepted.
    pub supported: bool,
    /// Whether a conversion route is configured.
    pub routable: bool,
}

/// Body for `POST /assets`.
#[derive(Debug, Deserialize)]
pub struct RegisterAssetRequest {
    /// Must be the bank admin.
    pub caller: String,
    /// Asset id string (`0x...`).
    pub asset: String,
}

/// Query for `DELETE /assets/:asset`.
#[derive(Debug, Deserialize)]
pub struct CallerQuery {
    /// Must be the bank admin.
    pub caller: String,
}

/// Body for `POST /routes`.
#[derive(Debug, Deserialize)]
pub struct SetRouteRequest {
    /// Must be the bank admin.
    pub caller: String,
    /// The input asset the route converts from.
    pub asset: String,
    /// Ordered path of asset id strings, ending at the settlement asset.
    pub path: Vec<String>,
}

/// One balance row in balance responses.
#[derive(Debug, Serialize, Deserialize)]
pub struct BalanceEntry {
    /// The asset.
    pub asset: AssetId,
    /// Canonical balance.
    pub balance: u128,
}

/// Body for `POST /deposits/native`.
#[derive(Debug, Deserialize)]
pub struct NativeDepositRequest {
    /// The account to credit.
    pub owner: String,
    /// Amount in native smallest units (18 decimals).
    pub amount: u128,
}

/// Body for `POST /deposits/token`.
#[derive(Debug, Deserialize)]
pub struct TokenDepositRequest {
    /// The account to credit.
    pub owner: String,
    /// Asset id string.
    pub asset: String,
    /// Amount in the asset's native units.
    pub amount: u128,
}

/// Body for `POST /deposits/convert`.
#[derive(Debug, Deserialize)]
pub struct ConvertDepositRequest {
    /// The account to credit.
    pub owner: String,
    /// The input asset to convert.
    pub asset: String,
    /// Input amount in the asset's native units.
    pub amount: u128,
    /// Minimum acceptable settlement output (the slippage floor).
    pub minimum_out: u128,
    /// Seconds from now until the conversion expires. Default 120.
    pub deadline_secs: Option<u64>,
}

/// Body for `POST /withdrawals/native` and `/withdrawals/token`.
#[derive(Debug, Deserialize)]
pub struct WithdrawalRequest {
    /// The account to debit.
    pub owner: String,
    /// Asset id string; absent for native withdrawals.
    pub asset: Option<String>,
    /// Canonical (6-decimal) value to withdraw.
    pub value: u128,
}

/// Body for `POST /faucet` (devnet only).
#[derive(Debug, Deserialize)]
pub struct FaucetRequest {
    /// The account to fund.
    pub account: String,
    /// Asset id string.
    pub asset: String,
    /// Raw amount in the asset's native units.
    pub amount: u128,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health` -- returns 200 if the node is alive.
///
/// Liveness only; subsystem health belongs in `/status`.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

/// `GET /status` -- node and bank summary.
async fn status_handler(State(state): State<AppState>) -> Json<StatusResponse> {
    let counters = state.bank.counters();
    Json(StatusResponse {
        version: state.version.clone(),
        network: state.network.clone(),
        total_value: state.bank.total_value(),
        available_capacity: state.bank.available_capacity(),
        settlement_asset: state.bank.settlement_asset(),
        deposits: counters.deposits,
        withdrawals: counters.withdrawals,
        uptime_secs: (Utc::now() - state.started_at).num_seconds(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// `GET /bank` -- limits, capacity, counters.
async fn bank_handler(State(state): State<AppState>) -> Json<BankResponse> {
    let limits = state.bank.limits();
    let counters = state.bank.counters();
    Json(BankResponse {
        bank_cap: limits.bank_cap,
        withdrawal_ceiling: limits.withdrawal_ceiling,
        total_value: state.bank.total_value(),
        available_capacity: state.bank.available_capacity(),
        deposits: counters.deposits,
        withdrawals: counters.withdrawals,
    })
}

/// `GET /price` -- a freshly validated oracle quote.
async fn price_handler(
    State(state): State<AppState>,
) -> Result<Json<aurum_bank::oracle::PriceQuote>, ApiError> {
    Ok(Json(state.bank.current_price().await?))
}

/// `GET /assets` -- every ever-registered asset, in order.
async fn assets_handler(State(state): State<AppState>) -> Json<Vec<AssetEntry>> {
    let entries = state
        .bank
        .list_assets()
        .into_iter()
        .map(|record| AssetEntry {
            asset: record.id,
            decimals: record.decimals,
            supported: record.supported,
            routable: state.bank.has_conversion_route(record.id),
        })
        .collect();
    Json(entries)
}

/// `POST /assets` -- register an asset (admin).
async fn register_asset_handler(
    State(state): State<AppState>,
    Json(req): Json<RegisterAssetRequest>,
) -> Result<Json<AssetEntry>, ApiError> {
    let asset = parse_asset(&req.asset)?;
    let decimals = state.bank.register_asset(&req.caller, asset).await?;
    Ok(Json(AssetEntry {
        asset,
        decimals,
        supported: true,
        routable: state.bank.has_conversion_route(asset),
    }))
}

/// `DELETE /assets/:asset` -- unregister an asset (admin).
async fn unregister_asset_handler(
    State(state): State<AppState>,
    Path(asset): Path<String>,
    Query(query): Query<CallerQuery>,
) -> Result<StatusCode, ApiError> {
    let asset = parse_asset(&asset)?;
    state.bank.unregister_asset(&query.caller, asset)?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /routes` -- configure a conversion route (admin).
async fn set_route_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRouteRequest>,
) -> Result<StatusCode, ApiError> {
    let asset = parse_asset(&req.asset)?;
    let path = req
        .path
        .iter()
        .map(|s| parse_asset(s))
        .collect::<Result<Vec<AssetId>, ApiError>>()?;
    state.bank.set_conversion_route(&req.caller, asset, path)?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /balances/:owner` -- all non-zero balances.
async fn balances_handler(
    State(state): State<AppState>,
    Path(owner): Path<String>,
) -> Json<Vec<BalanceEntry>> {
    let entries = state
        .bank
        .balances_of(&owner)
        .into_iter()
        .map(|(asset, balance)| BalanceEntry { asset, balance })
        .collect();
    Json(entries)
}

/// `GET /balances/:owner/:asset` -- one balance. Zero when absent.
async fn balance_handler(
    State(state): State<AppState>,
    Path((owner, asset)): Path<(String, String)>,
) -> Result<Json<BalanceEntry>, ApiError> {
    let asset = parse_asset(&asset)?;
    Ok(Json(BalanceEntry {
        asset,
        balance: state.bank.balance_of(&owner, asset),
    }))
}

/// `POST /deposits/native`.
async fn deposit_native_handler(
    State(state): State<AppState>,
    Json(req): Json<NativeDepositRequest>,
) -> Result<Response, ApiError> {
    let timer = state.metrics.operation_latency_seconds.start_timer();
    let result = state.bank.deposit_native(&req.owner, req.amount).await;
    timer.observe_duration();
    match result {
        Ok(receipt) => {
            state.metrics.deposits_total.inc();
            state.metrics.set_total_value(state.bank.total_value());
            Ok(Json(receipt).into_response())
        }
        Err(e) => {
            state.metrics.operations_rejected_total.inc();
            Err(e.into())
        }
    }
}

/// `POST /deposits/token`.
async fn deposit_token_handler(
    State(state): State<AppState>,
    Json(req): Json<TokenDepositRequest>,
) -> Result<Response, ApiError> {
    let asset = parse_asset(&req.asset)?;
    let timer = state.metrics.operation_latency_seconds.start_timer();
    let result = state.bank.deposit_asset(&req.owner, asset, req.amount).await;
    timer.observe_duration();
    match result {
        Ok(receipt) => {
            state.metrics.deposits_total.inc();
            state.metrics.set_total_value(state.bank.total_value());
            Ok(Json(receipt).into_response())
        }
        Err(e) => {
            state.metrics.operations_rejected_total.inc();
            Err(e.into())
        }
    }
}

/// `POST /deposits/convert`.
async fn deposit_convert_handler(
    State(state): State<AppState>,
    Json(req): Json<ConvertDepositRequest>,
) -> Result<Response, ApiError> {
    let asset = parse_asset(&req.asset)?;
    let deadline =
        Utc::now().timestamp().max(0) as u64 + req.deadline_secs.unwrap_or(120);
    let timer = state.metrics.operation_latency_seconds.start_timer();
    let result = state
        .bank
        .deposit_with_conversion(&req.owner, asset, req.amount, req.minimum_out, deadline)
        .await;
    timer.observe_duration();
    match result {
        Ok(receipt) => {
            state.metrics.deposits_total.inc();
            state.metrics.conversions_total.inc();
            state.metrics.set_total_value(state.bank.total_value());
            Ok(Json(receipt).into_response())
        }
        Err(e) => {
            state.metrics.operations_rejected_total.inc();
            Err(e.into())
        }
    }
}

/// `POST /withdrawals/native`.
async fn withdraw_native_handler(
    State(state): State<AppState>,
    Json(req): Json<WithdrawalRequest>,
) -> Result<Response, ApiError> {
    let timer = state.metrics.operation_latency_seconds.start_timer();
    let result = state.bank.withdraw_native(&req.owner, req.value).await;
    timer.observe_duration();
    match result {
        Ok(receipt) => {
            state.metrics.withdrawals_total.inc();
            state.metrics.set_total_value(state.bank.total_value());
            Ok(Json(receipt).into_response())
        }
        Err(e) => {
            state.metrics.operations_rejected_total.inc();
            Err(e.into())
        }
    }
}

/// `POST /withdrawals/token`.
async fn withdraw_token_handler(
    State(state): State<AppState>,
    Json(req): Json<WithdrawalRequest>,
) -> Result<Response, ApiError> {
    let asset = match &req.asset {
        Some(s) => parse_asset(s)?,
        None => {
            return Err(ApiError::bad_request(
                "invalid_asset_id",
                "token withdrawals require an asset field",
            ))
        }
    };
    let timer = state.metrics.operation_latency_seconds.start_timer();
    let result = state.bank.withdraw_asset(&req.owner, asset, req.value).await;
    timer.observe_duration();
    match result {
        Ok(receipt) => {
            state.metrics.withdrawals_total.inc();
            state.metrics.set_total_value(state.bank.total_value());
            Ok(Json(receipt).into_response())
        }
        Err(e) => {
            state.metrics.operations_rejected_total.inc();
            Err(e.into())
        }
    }
}

/// `POST /faucet` -- devnet convenience: mints raw units into an
/// external account so deposits have something to pull. Returns 404 on
/// deployments without the simulated transfer agent.
async fn faucet_handler(
    State(state): State<AppState>,
    Json(req): Json<FaucetRequest>,
) -> Result<StatusCode, ApiError> {
    let faucet = state.faucet.as_ref().ok_or(ApiError {
        status: StatusCode::NOT_FOUND,
        code: "faucet_unavailable",
        message: "this node runs against real transfer mechanics".to_string(),
    })?;
    let asset = parse_asset(&req.asset)?;
    faucet.mint(&req.account, asset, req.amount);
    tracing::info!(account = %req.account, asset = %asset, amount = req.amount, "faucet mint");
    Ok(StatusCode::NO_CONTENT)
}
