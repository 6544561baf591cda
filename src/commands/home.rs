use crate::commands::classifier::read_file_field;
use crate::error::AppError;
use axum::extract::multipart::MultipartRejection;
use axum::extract::Multipart;
use axum::response::Html;
use axum::Json;
use serde_json::{json, Value};

const INTERFACE_HTML: &str = include_str!("../../assets/interface.html");

pub async fn index() -> Html<&'static str> {
    Html(INTERFACE_HTML)
}

/// Accepts a file without processing it.
pub async fn upload(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Value>, AppError> {
    match read_file_field(multipart).await? {
        Some(bytes) => {
            tracing::info!("Received upload of {} bytes", bytes.len());
            Ok(Json(json!({ "message": "File uploaded successfully!" })))
        }
        None => Err(AppError::invalid_payload("No file uploaded")),
    }
}
