use crate::error::AppError;
use crate::models::classify_types::Prediction;
use crate::services::labels::LabelTable;
use image::{DynamicImage, ImageReader};
use ndarray::Array4;
use std::io::Cursor;

pub const RESIZE_SIZE: u32 = 256;
pub const CROP_SIZE: u32 = 224;

// ImageNet normalization constants
const MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Decodes uploaded bytes, sniffing the format from the content.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, AppError> {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| AppError::decode(format!("Failed to read image: {}", e)))?
        .decode()
        .map_err(|e| AppError::decode(format!("Failed to decode image: {}", e)))
}

pub fn preprocess_image(img: &DynamicImage) -> Result<Array4<f32>, AppError> {
    let (w, h) = (img.width(), img.height());
    if w == 0 || h == 0 {
        return Err(AppError::decode("Image has no pixels"));
    }

    // The centre CROP_SIZE square of an image whose short side was scaled to
    // RESIZE_SIZE covers `short * CROP_SIZE / RESIZE_SIZE` source pixels. Crop
    // that window first so the resize never allocates more than the crop.
    let short = w.min(h);
    let side = ((short as f64 * CROP_SIZE as f64 / RESIZE_SIZE as f64).round() as u32)
        .clamp(1, short);
    let crop_x = (w - side) / 2;
    let crop_y = (h - side) / 2;
    let cropped = img
        .crop_imm(crop_x, crop_y, side, side)
        .resize_exact(CROP_SIZE, CROP_SIZE, image::imageops::FilterType::Triangle);
    let rgb = cropped.to_rgb8();

    // HWC bytes -> normalized CHW planes
    let raw = rgb.into_raw();
    let hw = (CROP_SIZE * CROP_SIZE) as usize;
    let mut data = vec![0f32; 3 * hw];
    for (i, pixel) in raw.chunks_exact(3).enumerate() {
        for c in 0..3 {
            data[c * hw + i] = (pixel[c] as f32 / 255.0 - MEAN[c]) / STD[c];
        }
    }

    Array4::from_shape_vec((1, 3, CROP_SIZE as usize, CROP_SIZE as usize), data)
        .map_err(|e| AppError::model(format!("Failed to create tensor: {}", e)))
}

pub fn softmax(logits: &[f32]) -> Vec<f32> {
    if logits.is_empty() {
        return Vec::new();
    }
    let max_logit = logits.iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b));
    let exps: Vec<f32> = logits.iter().map(|&x| (x - max_logit).exp()).collect();
    let exp_sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / exp_sum).collect()
}

/// Turns raw logits into the `top_k` most probable labels.
///
/// Ordering is descending by probability; equal probabilities keep ascending
/// class index because the sort is stable. `top_k` larger than the number of
/// classes is clamped.
pub fn rank_predictions(logits: &[f32], labels: &LabelTable, top_k: usize) -> Vec<Prediction> {
    let probabilities = softmax(logits);

    let mut indexed: Vec<(usize, f32)> = probabilities.into_iter().enumerate().collect();
    indexed.sort_by(|a, b| b.1.total_cmp(&a.1));

    let top_k = top_k.min(indexed.len());
    indexed[..top_k]
        .iter()
        .map(|&(idx, score)| Prediction {
            label: labels.name(idx),
            score: score.clamp(0.0, 1.0),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};

    fn labels(n: usize) -> LabelTable {
        LabelTable::from_names((0..n).map(|i| format!("label{}", i)).collect())
    }

    #[test]
    fn preprocess_any_size_yields_nchw_224() {
        for (w, h) in [(1, 1), (224, 224), (640, 480), (37, 900)] {
            let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb([10, 200, 30])));
            let tensor = preprocess_image(&img).unwrap();
            assert_eq!(tensor.shape(), &[1, 3, 224, 224]);
        }
    }

    #[test]
    fn extreme_aspect_ratios_stay_small() {
        for (w, h) in [(1, 30000), (30000, 1), (3, 20000)] {
            let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb([0, 0, 255])));
            let tensor = preprocess_image(&img).unwrap();
            assert_eq!(tensor.shape(), &[1, 3, 224, 224]);
            let b = tensor[[0, 2, 112, 112]];
            assert!((b - (1.0 - 0.406) / 0.225).abs() < 1e-4);
        }
    }

    #[test]
    fn preprocess_normalizes_each_channel() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(300, 300, Rgb([255, 0, 255])));
        let tensor = preprocess_image(&img).unwrap();
        let r = tensor[[0, 0, 100, 100]];
        let g = tensor[[0, 1, 100, 100]];
        assert!((r - (1.0 - 0.485) / 0.229).abs() < 1e-4);
        assert!((g - (0.0 - 0.456) / 0.224).abs() < 1e-4);
    }

    #[test]
    fn decode_rejects_garbage() {
        let err = decode_image(b"definitely not an image").unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::Decode);
    }

    #[test]
    fn decode_accepts_png_bytes() {
        let mut bytes = Vec::new();
        RgbImage::from_pixel(8, 4, Rgb([1, 2, 3]))
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        let img = decode_image(&bytes).unwrap();
        assert_eq!((img.width(), img.height()), (8, 4));
    }

    #[test]
    fn softmax_is_a_distribution() {
        let probs = softmax(&[1000.0, 1000.0, -5.0]);
        let sum: f32 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert!(probs.iter().all(|p| (0.0..=1.0).contains(p)));
    }

    #[test]
    fn ranking_is_descending_and_clamped() {
        let logits = [0.1, 3.0, -2.0, 1.5];
        let preds = rank_predictions(&logits, &labels(4), 10);
        assert_eq!(preds.len(), 4);
        assert_eq!(preds[0].label, "label1");
        assert!(preds.windows(2).all(|w| w[0].score >= w[1].score));
        let sum: f32 = preds.iter().map(|p| p.score).sum();
        assert!(sum <= 1.0 + 1e-5);
    }

    #[test]
    fn ties_keep_ascending_index() {
        let preds = rank_predictions(&[2.0, 5.0, 5.0, 5.0], &labels(4), 3);
        let names: Vec<_> = preds.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(names, ["label1", "label2", "label3"]);
    }

    #[test]
    fn missing_labels_fall_back_to_class_index() {
        let preds = rank_predictions(&[0.0, 9.0], &labels(1), 1);
        assert_eq!(preds[0].label, "class_1");
    }

    #[test]
    fn zero_k_is_empty() {
        assert!(rank_predictions(&[1.0, 2.0], &labels(2), 0).is_empty());
    }
}
