use crate::Detection;

/// Response text when the model ran but found nothing.
pub const NO_SIGNS_SENTINEL: &str = "no signs detected";

/// The detection service's response body.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DetectionReport {
    pub detected_words: Vec<String>,
    pub text: String,
    pub confidence_scores: Vec<f32>,
    pub total_detections: usize,
    /// Present (true) only on the degraded fallback path.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub degraded: bool,
}

/// Deduplicate raw detections by label, keeping the maximum confidence per
/// word and first-seen order. `total_detections` counts the raw regions.
pub fn build_report(detections: &[Detection], degraded: bool) -> DetectionReport {
    let mut words: Vec<String> = Vec::new();
    let mut scores: Vec<f32> = Vec::new();

    for detection in detections {
        match words.iter().position(|w| *w == detection.label) {
            Some(idx) => {
                if detection.confidence > scores[idx] {
                    scores[idx] = detection.confidence;
                }
            }
            None => {
                words.push(detection.label.clone());
                scores.push(detection.confidence);
            }
        }
    }

    let text = if words.is_empty() {
        NO_SIGNS_SENTINEL.to_string()
    } else {
        words.join(" ")
    };

    DetectionReport {
        detected_words: words,
        text,
        confidence_scores: scores,
        total_detections: detections.len(),
        degraded,
    }
}
