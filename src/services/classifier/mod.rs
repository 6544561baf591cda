pub mod inference;
pub mod model_manager;

use crate::error::AppError;
use crate::models::classify_types::Prediction;
use image::DynamicImage;

/// An image model that ranks class labels for a decoded image.
///
/// Implementations must be pure with respect to the image: the same input
/// and `top_k` always produce the same ranking.
pub trait ImageClassifier: Send + Sync {
    /// Returns at most `top_k` predictions, highest score first.
    fn classify(&self, image: &DynamicImage, top_k: usize) -> Result<Vec<Prediction>, AppError>;

    fn model_name(&self) -> &str;

    fn num_labels(&self) -> usize;
}

/// Decodes raw upload bytes and classifies them.
pub fn classify_bytes(
    classifier: &dyn ImageClassifier,
    bytes: &[u8],
    top_k: usize,
) -> Result<Vec<Prediction>, AppError> {
    let image = inference::decode_image(bytes)?;
    classifier.classify(&image, top_k)
}
