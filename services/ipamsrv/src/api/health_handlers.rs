//! Health Check API Handlers

use std::sync::Arc;

use axum::{extract::State, response::Json};
use serde_json::{json, Value};

use crate::app_state::AppState;

/// Health check endpoint
///
/// Reports SQLite reachability; answers 200 even when SQLite is down.
///
/// @route GET /health
/// @output Json<Value> - `{status, service, sqlite, timestamp}`
/// @side-effects None (read-only operation)
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<Value> {
    let sqlite = match state.store.ping().await {
        Ok(()) => "connected",
        Err(_) => "unavailable",
    };

    Json(json!({
        "status": "ok",
        "service": state.config.service.name,
        "sqlite": sqlite,
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}
