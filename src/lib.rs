pub mod commands;
pub mod config;
pub mod error;
pub mod models;
pub mod services;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use config::Config;
use services::classifier::model_manager::ModelManager;
use services::classifier::ImageClassifier;
use services::history::HistoryStore;
use services::labels::ensure_labels;
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub const APP_TITLE: &str = "Simple AI Web App";

/// Collaborators shared by every request. Built once at start-up.
#[derive(Clone)]
pub struct AppState {
    pub classifier: Arc<dyn ImageClassifier>,
    pub history: Arc<HistoryStore>,
    pub top_k: usize,
}

pub fn build_router(state: AppState, static_dir: &Path, body_limit_bytes: usize) -> Router {
    Router::new()
        .route("/", get(commands::home::index))
        .route("/predict", post(commands::classifier::predict))
        .route("/predict/", post(commands::classifier::predict))
        .route(
            "/history",
            get(commands::history::get_history)
                .post(commands::history::post_history)
                .delete(commands::history::delete_history),
        )
        .route("/upload", post(commands::home::upload))
        .route("/health", get(commands::classifier::health))
        .nest_service("/static", ServeDir::new(static_dir))
        .layer(DefaultBodyLimit::max(body_limit_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Fetches missing resources, loads the model and serves until Ctrl-C.
pub async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!("Starting {}", APP_TITLE);

    let labels = Arc::new(ensure_labels(&config.labels_path, &config.labels_url).await);
    let model = ModelManager::bootstrap(
        &config.model_path,
        &config.model_url,
        labels,
        config.intra_threads,
    )
    .await?;

    let history = HistoryStore::new(config.history_path.clone(), config.history_limit);
    tracing::info!(
        "History at {} (limit {})",
        history.path().display(),
        history.limit()
    );

    let state = AppState {
        classifier: Arc::new(model),
        history: Arc::new(history),
        top_k: config.top_k,
    };
    let app = build_router(state, &config.static_dir, config.body_limit_bytes);

    let addr = config.addr();
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
