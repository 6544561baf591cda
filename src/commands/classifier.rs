use crate::error::AppError;
use crate::models::classify_types::{ModelStatus, PredictResponse};
use crate::services::classifier::classify_bytes;
use crate::{AppState, APP_TITLE};
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;

fn multipart_error(context: &str, e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::payload_too_large(format!("Upload exceeds the size limit: {}", e.body_text()))
    } else {
        AppError::invalid_payload(format!("{}: {}", context, e.body_text()))
    }
}

/// Reads the bytes of the multipart field named `file`, if any.
pub async fn read_file_field(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Option<Vec<u8>>, AppError> {
    let mut multipart = match multipart {
        Ok(multipart) => multipart,
        Err(_) => return Ok(None),
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error("Malformed multipart body", e))?
    {
        if field.name() == Some("file") {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| multipart_error("Failed to read upload", e))?;
            return Ok(Some(bytes.to_vec()));
        }
    }

    Ok(None)
}

pub async fn predict(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<PredictResponse>, AppError> {
    let bytes = read_file_field(multipart)
        .await?
        .ok_or_else(|| AppError::missing_field("Field 'file' is required"))?;

    let classifier = state.classifier.clone();
    let top_k = state.top_k;

    // Inference is CPU-bound; keep it off the async workers.
    let predictions =
        tokio::task::spawn_blocking(move || classify_bytes(classifier.as_ref(), &bytes, top_k))
            .await
            .map_err(|e| AppError::from(format!("Task join failed: {}", e)))??;

    let predicted_class = predictions
        .first()
        .map(|p| p.label.clone())
        .ok_or_else(|| AppError::model("Model produced no predictions"))?;

    tracing::info!("Predicted {}", predicted_class);

    Ok(Json(PredictResponse {
        predicted_class,
        predictions,
    }))
}

pub async fn health(State(state): State<AppState>) -> Json<ModelStatus> {
    Json(ModelStatus {
        status: "ok",
        title: APP_TITLE,
        model: state.classifier.model_name().to_string(),
        num_labels: state.classifier.num_labels(),
    })
}
