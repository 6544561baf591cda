#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use classify_web::error::AppError;
use classify_web::models::classify_types::Prediction;
use classify_web::services::classifier::inference::{preprocess_image, rank_predictions};
use classify_web::services::classifier::ImageClassifier;
use classify_web::services::history::{HistoryStore, DEFAULT_HISTORY_LIMIT};
use classify_web::services::labels::LabelTable;
use classify_web::{build_router, AppState};
use http_body_util::BodyExt;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

pub const BOUNDARY: &str = "XBOUNDARYX";

/// Scores each colour channel by its mean normalized intensity, so a red
/// image ranks "red" first. Runs the real preprocessing and ranking code.
pub struct ChannelClassifier {
    labels: LabelTable,
}

impl ChannelClassifier {
    pub fn new() -> Self {
        Self {
            labels: LabelTable::parse("red\ngreen\nblue\nbackground\n"),
        }
    }
}

impl ImageClassifier for ChannelClassifier {
    fn classify(&self, image: &DynamicImage, top_k: usize) -> Result<Vec<Prediction>, AppError> {
        let tensor = preprocess_image(image)?;
        let mut logits: Vec<f32> = (0..3)
            .map(|c| tensor.index_axis(ndarray::Axis(1), c).mean().unwrap_or(0.0))
            .collect();
        logits.push(0.0);
        Ok(rank_predictions(&logits, &self.labels, top_k))
    }

    fn model_name(&self) -> &str {
        "channel-means"
    }

    fn num_labels(&self) -> usize {
        self.labels.len()
    }
}

pub struct TestApp {
    pub router: Router,
    pub history: Arc<HistoryStore>,
    pub dir: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_body_limit(10 * 1024 * 1024)
    }

    pub fn with_body_limit(body_limit_bytes: usize) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let history = Arc::new(HistoryStore::new(
            dir.path().join("history.json"),
            DEFAULT_HISTORY_LIMIT,
        ));
        let state = AppState {
            classifier: Arc::new(ChannelClassifier::new()),
            history: history.clone(),
            top_k: 3,
        };
        let static_dir = dir.path().join("static");
        std::fs::create_dir_all(&static_dir).unwrap();
        let router = build_router(state, &static_dir, body_limit_bytes);
        Self {
            router,
            history,
            dir,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

pub fn png_bytes(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
    let mut bytes = Vec::new();
    RgbImage::from_pixel(width, height, Rgb(color))
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

pub fn multipart_body(field: &str, filename: &str, content: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn multipart_request(uri: &str, field: &str, content: &[u8]) -> Request<Body> {
    Request::post(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(field, "upload.png", content)))
        .unwrap()
}

pub fn json_request(method: &str, uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}
