use super::state::AppState;
use crate::error::RelayError;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Serialize;
use tracing::error;
use uuid::Uuid;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub active_sessions: usize,
    pub connections: usize,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /health
/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".to_string(),
            active_sessions: state.orchestrator.active_sessions().await,
            connections: state.hub.count().await,
        }),
    )
}

/// GET /sections/:section_id
/// Get a persisted section
pub async fn get_section(
    State(state): State<AppState>,
    Path(section_id): Path<Uuid>,
) -> impl IntoResponse {
    match state.store.section(section_id).await {
        Ok(Some(section)) => (StatusCode::OK, Json(section)).into_response(),
        Ok(None) => not_found(section_id),
        Err(e) => internal_error(e),
    }
}

/// GET /sections/:section_id/utterances
/// Get the transcript of a section (accumulated so far)
pub async fn get_section_utterances(
    State(state): State<AppState>,
    Path(section_id): Path<Uuid>,
) -> impl IntoResponse {
    match state.store.utterances(section_id).await {
        Ok(utterances) => (StatusCode::OK, Json(utterances)).into_response(),
        Err(RelayError::NotFound(_)) => not_found(section_id),
        Err(e) => internal_error(e),
    }
}

fn not_found(section_id: Uuid) -> axum::response::Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: format!("Section {} not found", section_id),
        }),
    )
        .into_response()
}

fn internal_error(e: RelayError) -> axum::response::Response {
    error!("Store read failed: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
        .into_response()
}
