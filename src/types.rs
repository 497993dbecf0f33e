use serde::{Deserialize, Serialize};

use crate::classifier::{Classification, Label};

#[derive(Debug, Clone, Deserialize)]
pub struct DetectionRequest {
    pub language: String,
    pub audio_format: String,
    pub audio_base64: String,
}

#[derive(Debug, Serialize)]
pub struct DetectionResponse {
    pub id: String,
    pub created: i64,
    pub classification: Label,
    pub confidence: f64,
    pub explanation: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub features: Option<FeatureReport>,
}

#[derive(Debug, Serialize)]
pub struct FeatureReport {
    pub zero_crossing_rate: f64,
    pub energy_variance: f64,
    pub spectral_flatness: f64,
    pub score: u8,
}

#[derive(Debug, Serialize)]
pub struct ProbeResponse {
    pub status: &'static str,
    pub message: &'static str,
}

impl DetectionResponse {
    pub fn new(id: String, result: &Classification, include_features: bool) -> Self {
        Self {
            id,
            created: chrono::Utc::now().timestamp(),
            classification: result.label,
            confidence: round_to(result.confidence, 2),
            explanation: result.label.explanation(),
            features: include_features.then(|| FeatureReport {
                zero_crossing_rate: round_to(result.features.zero_crossing_rate, 4),
                energy_variance: round_to(result.features.energy_variance, 6),
                spectral_flatness: round_to(result.features.spectral_flatness, 4),
                score: result.score,
            }),
        }
    }
}

fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureVector;

    fn result() -> Classification {
        Classification {
            label: Label::AiGenerated,
            confidence: 0.7999999999999999,
            score: 2,
            features: FeatureVector {
                zero_crossing_rate: 0.012_345_6,
                energy_variance: 0.000_123_456_7,
                spectral_flatness: 0.987_654_3,
            },
        }
    }

    #[test]
    fn response_rounds_reported_values() {
        let response = DetectionResponse::new("detect-1".into(), &result(), true);
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["classification"], "ai-generated");
        assert_eq!(json["confidence"], 0.8);
        assert_eq!(json["features"]["zero_crossing_rate"], 0.0123);
        assert_eq!(json["features"]["energy_variance"], 0.000123);
        assert_eq!(json["features"]["spectral_flatness"], 0.9877);
        assert_eq!(json["features"]["score"], 2);
    }

    #[test]
    fn features_can_be_omitted() {
        let response = DetectionResponse::new("detect-1".into(), &result(), false);
        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("features").is_none());
        assert!(json["explanation"].as_str().unwrap().contains("AI-generated"));
    }
}
