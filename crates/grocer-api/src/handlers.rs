//! Route handler functions for the chat API.
//!
//! Turns run on the blocking pool: the orchestrator holds a std mutex for
//! the whole turn and the LLM oracle makes a blocking HTTP call.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use grocer_chat::{ChatMessage, TurnResponse};

use crate::error::ApiError;
use crate::state::AppState;

// =============================================================================
// Request / response types
// =============================================================================

/// Request body for POST /api/chat.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResetResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub product_count: usize,
    pub oracle: String,
    pub oracle_configured: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub messages: Vec<ChatMessage>,
    /// Summary of the filters currently in force; empty when none are.
    pub context: String,
}

// =============================================================================
// Handlers
// =============================================================================

/// POST /api/chat - run one conversation turn.
pub async fn chat(
    State(state): State<AppState>,
    Json(body): Json<ChatRequest>,
) -> Result<Json<TurnResponse>, ApiError> {
    let message = body
        .message
        .filter(|m| !m.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("No message provided".to_string()))?;

    let orchestrator = state.orchestrator.clone();
    let response = tokio::task::spawn_blocking(move || orchestrator.handle_turn(&message))
        .await
        .map_err(|e| ApiError::Internal(format!("Turn task failed: {}", e)))??;

    Ok(Json(response))
}

/// POST /api/reset - clear filters and transcript.
pub async fn reset(State(state): State<AppState>) -> Result<Json<ResetResponse>, ApiError> {
    state.orchestrator.reset_session()?;
    Ok(Json(ResetResponse {
        message: "Conversation reset successfully".to_string(),
    }))
}

/// GET /api/health - health check.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let orchestrator = &state.orchestrator;
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        product_count: orchestrator.catalog().len(),
        oracle: orchestrator.oracle_name().to_string(),
        oracle_configured: orchestrator.oracle_configured(),
    })
}

/// GET /api/history - transcript of the current conversation.
pub async fn history(State(state): State<AppState>) -> Result<Json<HistoryResponse>, ApiError> {
    let messages = state.orchestrator.history()?;
    let context = state.orchestrator.context_summary()?;
    Ok(Json(HistoryResponse { messages, context }))
}
