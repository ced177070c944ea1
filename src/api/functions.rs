//! Single-shot function calling endpoint.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};

use super::routes::AppState;
use super::types::FunctionCallRequest;
use crate::dispatch::DispatchOutcome;

pub async fn call_function(
    State(state): State<Arc<AppState>>,
    Json(req): Json<FunctionCallRequest>,
) -> Result<Json<DispatchOutcome>, (StatusCode, String)> {
    let query = req.query.trim();
    if query.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "query must not be empty".to_string()));
    }
    Ok(Json(state.dispatcher.dispatch(query, req.strategy).await))
}
