use crate::error::AppError;
use crate::models::classify_types::Prediction;
use crate::services::classifier::inference;
use crate::services::classifier::ImageClassifier;
use crate::services::download::download_file;
use crate::services::labels::LabelTable;
use image::DynamicImage;
use ndarray::Array4;
use ort::session::Session;
use ort::value::Value;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Owns the ONNX Runtime session and the label table it was paired with.
pub struct ModelManager {
    model_name: String,
    labels: Arc<LabelTable>,
    // `Session::run` needs `&mut`, so concurrent requests take turns here.
    session: Mutex<Session>,
}

impl ModelManager {
    /// Downloads the model to `model_path` if it is not there yet, then loads it.
    pub async fn bootstrap(
        model_path: &Path,
        model_url: &str,
        labels: Arc<LabelTable>,
        intra_threads: usize,
    ) -> Result<Self, AppError> {
        if !model_path.exists() {
            tracing::info!(
                "Model not found at {}, downloading {}",
                model_path.display(),
                model_url
            );
            download_file(model_url, model_path)
                .await
                .map_err(|e| AppError::model(format!("Failed to download model: {}", e)))?;
        }
        Self::load(model_path.to_path_buf(), labels, intra_threads).await
    }

    pub async fn load(
        model_path: PathBuf,
        labels: Arc<LabelTable>,
        intra_threads: usize,
    ) -> Result<Self, AppError> {
        let path = model_path.clone();
        let session = tokio::task::spawn_blocking(move || -> Result<Session, AppError> {
            let _ = ort::init().with_name("classify-web").commit();

            let builder = Session::builder()
                .map_err(|e| AppError::model(format!("Failed to create session builder: {}", e)))?
                .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)
                .map_err(|e| AppError::model(format!("Failed to set optimization level: {}", e)))?
                .with_intra_threads(intra_threads)
                .map_err(|e| AppError::model(format!("Failed to set intra threads: {}", e)))?;

            builder
                .commit_from_file(&path)
                .map_err(|e| AppError::model(format!("Failed to load ONNX model: {}", e)))
        })
        .await
        .map_err(|e| AppError::model(format!("Failed to spawn model loading task: {}", e)))??;

        let model_name = model_path
            .file_stem()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();
        tracing::info!(
            "Loaded model {} with {} labels",
            model_path.display(),
            labels.len()
        );

        Ok(Self {
            model_name,
            labels,
            session: Mutex::new(session),
        })
    }

    /// Runs the network and returns the raw logits of the first output.
    fn run_logits(&self, input: Array4<f32>) -> Result<Vec<f32>, AppError> {
        let mut model = self
            .session
            .lock()
            .map_err(|_| AppError::model("Model session lock poisoned"))?;

        let input_name = model.inputs()[0].name().to_string();

        let input_tensor = Value::from_array(input)
            .map_err(|e| AppError::model(format!("Failed to create tensor value: {}", e)))?;

        let outputs = model
            .run(ort::inputs![input_name.as_str() => input_tensor])
            .map_err(|e| AppError::model(format!("Inference failed: {}", e)))?;

        let output_value = outputs
            .values()
            .next()
            .ok_or_else(|| AppError::model("Model produced no outputs"))?;

        let (_, data) = output_value
            .try_extract_tensor::<f32>()
            .map_err(|e| AppError::model(format!("Failed to extract output tensor: {}", e)))?;

        Ok(data.to_vec())
    }
}

impl ImageClassifier for ModelManager {
    fn classify(&self, image: &DynamicImage, top_k: usize) -> Result<Vec<Prediction>, AppError> {
        let tensor = inference::preprocess_image(image)?;
        let logits = self.run_logits(tensor)?;
        Ok(inference::rank_predictions(&logits, &self.labels, top_k))
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn num_labels(&self) -> usize {
        self.labels.len()
    }
}
