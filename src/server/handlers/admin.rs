use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::core::security::require_admin;
use crate::rag::seed::reference_manuals;
use crate::schema::ManualChunk;
use crate::state::AppState;

/// Starts ingestion of the reference manuals and returns immediately.
pub async fn seed(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&headers, state.admin_token.as_ref())?;

    let index = state.index.clone();
    tokio::spawn(async move {
        let manuals = reference_manuals();
        tracing::info!("Seeding {} reference manual chunks", manuals.len());
        match index.upsert(manuals).await {
            Ok(count) => tracing::info!("Seeding complete: {} chunks upserted", count),
            Err(err) => tracing::error!("Seeding failed: {}", err),
        }
    });

    Ok(Json(json!({
        "status": "success",
        "message": "Ingestion pipeline triggered. Data is being vectorised.",
    })))
}

pub async fn upsert_manuals(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<Vec<ManualChunk>>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&headers, state.admin_token.as_ref())?;
    let Json(chunks) = payload.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;

    for (index, chunk) in chunks.iter().enumerate() {
        chunk
            .validate()
            .map_err(|err| ApiError::BadRequest(format!("chunk {}: {}", index, err)))?;
    }

    let upserted = state.index.upsert(chunks).await.map_err(ApiError::internal)?;
    Ok(Json(json!({ "status": "success", "upserted": upserted })))
}

pub async fn list_documents(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&headers, state.admin_token.as_ref())?;

    let count = state.index.count().await.map_err(ApiError::internal)?;
    let documents = state.index.list_sources().await.map_err(ApiError::internal)?;
    Ok(Json(json!({ "count": count, "documents": documents })))
}

/// Effective configuration with secrets masked.
pub async fn get_config(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&headers, state.admin_token.as_ref())?;
    let config = state.config.load_config();
    Ok(Json(state.config.redact_sensitive_values(&config)))
}
