use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::state::AppState;

pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "active",
        "service": state.settings.app.name,
        "environment": state.settings.app.environment,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
