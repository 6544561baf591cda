use crate::error::AppError;
use crate::models::history_types::{HistoryEntry, HistoryResponse};
use crate::AppState;
use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

pub async fn get_history(State(state): State<AppState>) -> Json<HistoryResponse> {
    Json(HistoryResponse {
        history: state.history.read_all().await,
    })
}

/// Stores `{ label, dataUrl?, t? }`. The body is read as JSON regardless of
/// the declared content type.
pub async fn post_history(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let payload: Value = serde_json::from_slice(&body)
        .map_err(|_| AppError::invalid_payload("Invalid JSON"))?;

    if !payload.as_object().is_some_and(|obj| obj.contains_key("label")) {
        return Err(AppError::invalid_payload("Missing label"));
    }

    let entry: HistoryEntry = serde_json::from_value(payload)
        .map_err(|e| AppError::invalid_payload(format!("Invalid history entry: {}", e)))?;

    // Save failures are logged by the store; the reply stays `ok`.
    state.history.append(entry).await;

    Ok(Json(json!({ "ok": true })))
}

pub async fn delete_history(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    state.history.clear().await?;
    Ok(Json(json!({ "ok": true })))
}
