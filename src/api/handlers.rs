//! HTTP request handlers

use super::sse::outbox_stream;
use super::types::{ErrorResponse, EventResponse, InboundRequest};
use super::AppState;
use crate::runtime::{RuntimeError, Stats};
use crate::state_machine::UserId;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // User interactions
        .route("/api/users/:user_id/events", post(post_event))
        // Deliveries to other users
        .route("/api/outbox", get(stream_outbox))
        .route("/api/stats", get(get_stats))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Events
// ============================================================

async fn post_event(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    Json(request): Json<InboundRequest>,
) -> Result<Json<EventResponse>, AppError> {
    let effects = state.runtime.send_event(user_id, request.into()).await?;
    Ok(Json(EventResponse { effects }))
}

async fn stream_outbox(State(state): State<AppState>) -> impl IntoResponse {
    tracing::info!("Outbox subscriber connected");
    outbox_stream(state.outbox.subscribe())
}

async fn get_stats(State(state): State<AppState>) -> Result<Json<Stats>, AppError> {
    Ok(Json(state.runtime.stats().await?))
}

async fn get_version() -> &'static str {
    concat!("average-bot ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

enum AppError {
    Unavailable(String),
    Internal(String),
}

impl From<RuntimeError> for AppError {
    fn from(e: RuntimeError) -> Self {
        tracing::error!(error = %e, "Request failed");
        match e {
            RuntimeError::SessionUnavailable(_) | RuntimeError::ReplyDropped(_) => {
                AppError::Unavailable(e.to_string())
            }
            RuntimeError::Store(_) => AppError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
