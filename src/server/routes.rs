//! API route handlers.
//!
//! All endpoints return JSON. State is shared via `Arc<ServerState>`;
//! each wallet path segment maps to one session in the registry.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::registry::SessionRegistry;
use crate::session::{SessionSnapshot, SharedSession};
use crate::types::{BetRecord, SessionError, Side, StakeMode};

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Shared state accessible by all route handlers.
pub struct ServerState {
    pub registry: SessionRegistry,
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl ServerState {
    pub fn new(registry: SessionRegistry) -> Self {
        Self {
            registry,
            started_at: chrono::Utc::now(),
        }
    }
}

pub type AppState = Arc<ServerState>;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ModeRequest {
    pub mode: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StakeRequest {
    pub stake: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SideRequest {
    pub side: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TopUpRequest {
    pub amount: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct FlipResponse {
    pub record: BetRecord,
    /// The history line for this bet, e.g. `Heads (0.25): Win +0.25`.
    pub line: String,
    pub session: SessionSnapshot,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub sessions: usize,
    pub uptime_secs: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum ApiError {
    Session(SessionError),
    BadRequest(String),
    NotFound(String),
}

impl From<SessionError> for ApiError {
    fn from(e: SessionError) -> Self {
        ApiError::Session(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            ApiError::Session(e) => {
                let status = match e {
                    SessionError::InvalidStake { .. }
                    | SessionError::NoStakeSelected
                    | SessionError::InvalidAmount(_) => StatusCode::BAD_REQUEST,
                    SessionError::InvalidBetState(_) => StatusCode::UNPROCESSABLE_ENTITY,
                    SessionError::SessionBusy
                    | SessionError::FlightInProgress
                    | SessionError::UnknownFlight => StatusCode::CONFLICT,
                };
                (status, e.kind().to_string(), e.to_string())
            }
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, "bad_request".to_string(), message)
            }
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, "not_found".to_string(), message),
        };

        debug!(%status, error = %error, "Request rejected");
        (status, Json(ErrorBody { error, message })).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        sessions: state.registry.len().await,
        uptime_secs: (chrono::Utc::now() - state.started_at).num_seconds(),
    })
}

/// Look up an open session; only `open_session` creates one.
async fn existing(state: &ServerState, wallet: &str) -> Result<SharedSession, ApiError> {
    state
        .registry
        .get(wallet)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("No session for wallet {wallet}")))
}

/// POST /api/sessions/:wallet
///
/// Opens the wallet's session, or returns it if already open.
pub async fn open_session(
    State(state): State<AppState>,
    Path(wallet): Path<String>,
) -> Json<SessionSnapshot> {
    let session = state.registry.get_or_create(&wallet).await;
    Json(session.snapshot().await)
}

/// GET /api/sessions/:wallet
pub async fn get_session(
    State(state): State<AppState>,
    Path(wallet): Path<String>,
) -> ApiResult<SessionSnapshot> {
    let session = existing(&state, &wallet).await?;
    Ok(Json(session.snapshot().await))
}

/// DELETE /api/sessions/:wallet
pub async fn delete_session(
    State(state): State<AppState>,
    Path(wallet): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.registry.remove(&wallet).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("No session for wallet {wallet}")))
    }
}

/// POST /api/sessions/:wallet/mode
pub async fn set_mode(
    State(state): State<AppState>,
    Path(wallet): Path<String>,
    Json(req): Json<ModeRequest>,
) -> ApiResult<SessionSnapshot> {
    let mode: StakeMode = req
        .mode
        .parse()
        .map_err(|e: anyhow::Error| ApiError::BadRequest(e.to_string()))?;
    let session = existing(&state, &wallet).await?;
    let mut s = session.lock().await;
    s.set_mode(mode);
    Ok(Json(s.snapshot()))
}

/// POST /api/sessions/:wallet/mode/toggle
pub async fn toggle_mode(
    State(state): State<AppState>,
    Path(wallet): Path<String>,
) -> ApiResult<SessionSnapshot> {
    let session = existing(&state, &wallet).await?;
    let mut s = session.lock().await;
    s.toggle_mode();
    Ok(Json(s.snapshot()))
}

/// POST /api/sessions/:wallet/stake
pub async fn select_stake(
    State(state): State<AppState>,
    Path(wallet): Path<String>,
    Json(req): Json<StakeRequest>,
) -> ApiResult<SessionSnapshot> {
    let session = existing(&state, &wallet).await?;
    let mut s = session.lock().await;
    s.select_stake(req.stake)?;
    Ok(Json(s.snapshot()))
}

/// POST /api/sessions/:wallet/side
pub async fn select_side(
    State(state): State<AppState>,
    Path(wallet): Path<String>,
    Json(req): Json<SideRequest>,
) -> ApiResult<SessionSnapshot> {
    let side: Side = req
        .side
        .parse()
        .map_err(|e: anyhow::Error| ApiError::BadRequest(e.to_string()))?;
    let session = existing(&state, &wallet).await?;
    let mut s = session.lock().await;
    s.select_side(side)?;
    Ok(Json(s.snapshot()))
}

/// POST /api/sessions/:wallet/flip
///
/// Waits out the configured spin before answering.
pub async fn flip(
    State(state): State<AppState>,
    Path(wallet): Path<String>,
) -> ApiResult<FlipResponse> {
    let session = existing(&state, &wallet).await?;
    let (record, snapshot) = session.flip_with_snapshot().await?;
    Ok(Json(FlipResponse {
        line: record.to_string(),
        record,
        session: snapshot,
    }))
}

/// POST /api/sessions/:wallet/top-up
pub async fn top_up(
    State(state): State<AppState>,
    Path(wallet): Path<String>,
    Json(req): Json<TopUpRequest>,
) -> ApiResult<SessionSnapshot> {
    let session = existing(&state, &wallet).await?;
    let mut s = session.lock().await;
    s.top_up(req.amount)?;
    Ok(Json(s.snapshot()))
}

/// POST /api/sessions/:wallet/reset
pub async fn reset(
    State(state): State<AppState>,
    Path(wallet): Path<String>,
) -> ApiResult<SessionSnapshot> {
    let session = existing(&state, &wallet).await?;
    let mut s = session.lock().await;
    s.reset()?;
    Ok(Json(s.snapshot()))
}

/// GET /api/sessions/:wallet/history
pub async fn get_history(
    State(state): State<AppState>,
    Path(wallet): Path<String>,
) -> ApiResult<Vec<BetRecord>> {
    let session = existing(&state, &wallet).await?;
    let s = session.lock().await;
    Ok(Json(s.history().to_vec()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
