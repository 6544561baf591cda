use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Prediction {
    pub label: String,
    pub score: f32,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PredictResponse {
    pub predicted_class: String,
    pub predictions: Vec<Prediction>,
}

#[derive(Debug, Serialize, Clone)]
pub struct ModelStatus {
    pub status: &'static str,
    pub title: &'static str,
    pub model: String,
    pub num_labels: usize,
}
