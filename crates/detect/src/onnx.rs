//! ONNX gesture detector.
//!
//! Wraps a YOLO-family detection model exported to ONNX. The model is
//! opaque: this module only stages the input tensor, runs the session and
//! maps prediction rows back to labels.

use image::{imageops::FilterType, DynamicImage, GenericImageView};
use ndarray::ArrayView2;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use std::path::Path;
use std::sync::Mutex;

use crate::{DetectError, Detection, GestureDetector};

/// Model input edge length (pixels).
const INPUT_SIZE: u32 = 640;

/// Letterbox padding value, normalized.
const PAD_VALUE: f32 = 114.0 / 255.0;

/// IoU above which two same-class boxes are considered one region.
const IOU_THRESHOLD: f32 = 0.45;

pub struct OnnxGestureDetector {
    session: Mutex<Session>,
    input_name: String,
    output_name: String,
    labels: Vec<String>,
    confidence_threshold: f32,
}

impl OnnxGestureDetector {
    pub fn load(
        model_path: impl AsRef<Path>,
        labels: Vec<String>,
        confidence_threshold: f32,
    ) -> crate::Result<Self> {
        let session = Session::builder()
            .map_err(|e| DetectError::ModelLoad(e.to_string()))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| DetectError::ModelLoad(e.to_string()))?
            .commit_from_file(model_path.as_ref())
            .map_err(|e| DetectError::ModelLoad(e.to_string()))?;

        let input_name = session
            .inputs()
            .first()
            .map(|i| i.name().to_string())
            .ok_or_else(|| DetectError::ModelLoad("model has no inputs".to_string()))?;
        let output_name = session
            .outputs()
            .first()
            .map(|o| o.name().to_string())
            .ok_or_else(|| DetectError::ModelLoad("model has no outputs".to_string()))?;

        tracing::info!(
            model = %model_path.as_ref().display(),
            classes = labels.len(),
            confidence_threshold,
            "gesture model loaded"
        );

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            output_name,
            labels,
            confidence_threshold,
        })
    }

    fn label_for(&self, class: usize) -> String {
        self.labels
            .get(class)
            .cloned()
            .unwrap_or_else(|| format!("class_{class}"))
    }
}

impl GestureDetector for OnnxGestureDetector {
    fn detect(&self, image: &DynamicImage) -> crate::Result<Vec<Detection>> {
        let pixels = letterbox_chw(image, INPUT_SIZE);
        let input = Tensor::from_array((
            [1i64, 3, INPUT_SIZE as i64, INPUT_SIZE as i64],
            pixels,
        ))
        .map_err(|e| DetectError::Inference(e.to_string()))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| DetectError::Inference("session lock poisoned".to_string()))?;

        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => input])
            .map_err(|e| DetectError::Inference(e.to_string()))?;

        let output = outputs
            .get(self.output_name.as_str())
            .ok_or_else(|| DetectError::Inference("missing model output".to_string()))?;

        let (shape, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| DetectError::Inference(e.to_string()))?;
        let dims: Vec<usize> = shape.iter().map(|&d| d as usize).collect();

        let candidates = decode_predictions(&dims, data, self.confidence_threshold)?;
        let kept = non_max_suppression(candidates, IOU_THRESHOLD);

        Ok(kept
            .into_iter()
            .map(|c| Detection {
                label: self.label_for(c.class),
                confidence: c.confidence,
            })
            .collect())
    }
}

/// One over-threshold prediction before non-max suppression.
#[derive(Debug, Clone, PartialEq)]
struct Candidate {
    /// Box center/size in model pixels: cx, cy, w, h.
    bbox: [f32; 4],
    class: usize,
    confidence: f32,
}

/// Decode a YOLO prediction tensor of shape `[1, 4 + classes, anchors]`
/// (or its transposed export) into over-threshold candidates.
fn decode_predictions(
    dims: &[usize],
    data: &[f32],
    threshold: f32,
) -> crate::Result<Vec<Candidate>> {
    if dims.len() != 3 || dims[0] != 1 {
        return Err(DetectError::Inference(format!(
            "unexpected output shape: {dims:?}"
        )));
    }

    // Anchors always outnumber box attributes; use that to detect layout.
    let transposed = dims[1] > dims[2];
    let (rows, cols) = (dims[1], dims[2]);
    let view = ArrayView2::from_shape((rows, cols), data)
        .map_err(|e| DetectError::Inference(e.to_string()))?;
    let view = if transposed {
        view.reversed_axes()
    } else {
        view
    };

    let (attrs, anchors) = view.dim();
    if attrs <= 4 {
        return Err(DetectError::Inference(format!(
            "output has no class scores: {dims:?}"
        )));
    }

    let mut candidates = Vec::new();
    for anchor in 0..anchors {
        let mut best_class = 0usize;
        let mut best_score = 0f32;
        for class in 0..attrs - 4 {
            let score = view[(4 + class, anchor)];
            if score > best_score {
                best_score = score;
                best_class = class;
            }
        }
        if best_score >= threshold {
            candidates.push(Candidate {
                bbox: [
                    view[(0, anchor)],
                    view[(1, anchor)],
                    view[(2, anchor)],
                    view[(3, anchor)],
                ],
                class: best_class,
                confidence: best_score,
            });
        }
    }
    Ok(candidates)
}

/// Greedy per-class non-max suppression, highest confidence first.
fn non_max_suppression(mut candidates: Vec<Candidate>, iou_threshold: f32) -> Vec<Candidate> {
    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut kept: Vec<Candidate> = Vec::new();
    for candidate in candidates {
        let overlaps = kept.iter().any(|k| {
            k.class == candidate.class && iou(&k.bbox, &candidate.bbox) > iou_threshold
        });
        if !overlaps {
            kept.push(candidate);
        }
    }
    kept
}

fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let corners = |bx: &[f32; 4]| {
        let [cx, cy, w, h] = *bx;
        (cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0)
    };
    let (ax1, ay1, ax2, ay2) = corners(a);
    let (bx1, by1, bx2, by2) = corners(b);

    let inter_w = (ax2.min(bx2) - ax1.max(bx1)).max(0.0);
    let inter_h = (ay2.min(by2) - ay1.max(by1)).max(0.0);
    let inter = inter_w * inter_h;
    let union = (ax2 - ax1) * (ay2 - ay1) + (bx2 - bx1) * (by2 - by1) - inter;
    if union <= 0.0 {
        0.0
    } else {
        inter / union
    }
}

/// Aspect-preserving resize onto a padded square canvas, normalized to
/// [0, 1] in CHW channel order.
fn letterbox_chw(image: &DynamicImage, size: u32) -> Vec<f32> {
    let (width, height) = image.dimensions();
    let scale = (size as f32 / width as f32).min(size as f32 / height as f32);
    let new_w = ((width as f32 * scale).round() as u32).clamp(1, size);
    let new_h = ((height as f32 * scale).round() as u32).clamp(1, size);

    let resized = image
        .resize_exact(new_w, new_h, FilterType::Triangle)
        .to_rgb8();
    let pad_x = (size - new_w) / 2;
    let pad_y = (size - new_h) / 2;

    let plane = (size * size) as usize;
    let mut data = vec![PAD_VALUE; 3 * plane];
    for (x, y, pixel) in resized.enumerate_pixels() {
        let idx = ((y + pad_y) * size + (x + pad_x)) as usize;
        data[idx] = pixel[0] as f32 / 255.0;
        data[plane + idx] = pixel[1] as f32 / 255.0;
        data[2 * plane + idx] = pixel[2] as f32 / 255.0;
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Tensor with 2 classes and 8 anchors: anchor 0 is class 1 at 0.9,
    /// anchor 1 is class 0 at 0.05 (below threshold), anchor 2 is class 0
    /// at 0.4, the rest are background.
    fn sample_tensor() -> (Vec<usize>, Vec<f32>) {
        let dims = vec![1, 6, 8];
        #[rustfmt::skip]
        let data = vec![
            // one row per attribute, one column per anchor
            10.0, 50.0, 300.0, 1.0, 2.0, 3.0, 4.0, 5.0, // cx
            10.0, 50.0, 300.0, 1.0, 2.0, 3.0, 4.0, 5.0, // cy
            8.0, 8.0, 20.0, 1.0, 1.0, 1.0, 1.0, 1.0, // w
            8.0, 8.0, 20.0, 1.0, 1.0, 1.0, 1.0, 1.0, // h
            0.01, 0.05, 0.4, 0.0, 0.0, 0.0, 0.0, 0.0, // class 0 scores
            0.9, 0.02, 0.1, 0.0, 0.0, 0.0, 0.0, 0.0, // class 1 scores
        ];
        (dims, data)
    }

    #[test]
    fn test_decode_filters_by_threshold() {
        let (dims, data) = sample_tensor();
        let candidates = decode_predictions(&dims, &data, 0.1).unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].class, 1);
        assert!((candidates[0].confidence - 0.9).abs() < 1e-6);
        assert_eq!(candidates[1].class, 0);
    }

    #[test]
    fn test_decode_handles_transposed_layout() {
        let (dims, data) = sample_tensor();
        let view = ArrayView2::from_shape((dims[1], dims[2]), &data[..]).unwrap();
        let transposed: Vec<f32> = view.reversed_axes().iter().copied().collect();

        let candidates =
            decode_predictions(&[1, dims[2], dims[1]], &transposed, 0.1).unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].class, 1);
    }

    #[test]
    fn test_bad_shape_rejected() {
        assert!(decode_predictions(&[1, 6], &[0.0; 6], 0.1).is_err());
        assert!(decode_predictions(&[1, 4, 2], &[0.0; 8], 0.1).is_err());
    }

    fn cand(bbox: [f32; 4], class: usize, confidence: f32) -> Candidate {
        Candidate {
            bbox,
            class,
            confidence,
        }
    }

    #[test]
    fn test_nms_suppresses_overlapping_same_class() {
        let kept = non_max_suppression(
            vec![
                cand([50.0, 50.0, 20.0, 20.0], 0, 0.6),
                cand([52.0, 50.0, 20.0, 20.0], 0, 0.9),
                cand([50.0, 50.0, 20.0, 20.0], 1, 0.5),
                cand([300.0, 300.0, 20.0, 20.0], 0, 0.4),
            ],
            0.45,
        );
        // Highest-confidence class-0 box wins; the near-duplicate is
        // suppressed, the other class and the distant box survive.
        assert_eq!(kept.len(), 3);
        assert!((kept[0].confidence - 0.9).abs() < 1e-6);
        assert!(kept.iter().all(|c| c.bbox != [50.0, 50.0, 20.0, 20.0]
            || c.class == 1));
    }

    #[test]
    fn test_iou_disjoint_is_zero() {
        assert_eq!(
            iou(&[0.0, 0.0, 10.0, 10.0], &[100.0, 100.0, 10.0, 10.0]),
            0.0
        );
    }

    #[test]
    fn test_letterbox_dimensions_and_range() {
        let image = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
            320,
            160,
            image::Rgb([255, 0, 128]),
        ));
        let data = letterbox_chw(&image, 64);
        assert_eq!(data.len(), 3 * 64 * 64);
        assert!(data.iter().all(|&v| (0.0..=1.0).contains(&v)));
        // Top rows are padding in every channel.
        assert!((data[0] - PAD_VALUE).abs() < 1e-6);
    }
}
