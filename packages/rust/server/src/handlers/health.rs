//! GET /health

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde_json::{Value, json};

use crate::state::AppState;

pub async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "llm_configured": state.is_configured(),
        "prompt_version": state.prompt_version(),
    }))
}
