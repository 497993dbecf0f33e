//! Fixed-threshold scoring of a [`FeatureVector`].

use serde::Serialize;

use crate::features::FeatureVector;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Label {
    Human,
    AiGenerated,
}

impl Label {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Human => "human",
            Self::AiGenerated => "ai-generated",
        }
    }

    pub fn explanation(&self) -> &'static str {
        match self {
            Self::Human => "Natural fluctuations in pitch and energy indicate human speech.",
            Self::AiGenerated => {
                "Low pitch variation and uniform spectral characteristics \
                 suggest patterns commonly found in AI-generated speech."
            }
        }
    }
}

/// Each feature scores a point when it falls strictly below its threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub zero_crossing_rate: f64,
    pub energy_variance: f64,
    pub spectral_flatness: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            zero_crossing_rate: 0.08,
            energy_variance: 0.01,
            spectral_flatness: 0.2,
        }
    }
}

/// Affine map from score to confidence, one line per label.
///
/// The default is `min(0.9, 0.7 + 0.05 * score)` for ai-generated and
/// `0.6 + 0.05 * score` for human, i.e. 0.60, 0.65, 0.80, 0.85 for scores
/// 0 through 3.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidencePolicy {
    pub ai_intercept: f64,
    pub ai_slope: f64,
    pub ai_cap: f64,
    pub human_intercept: f64,
    pub human_slope: f64,
}

impl Default for ConfidencePolicy {
    fn default() -> Self {
        Self {
            ai_intercept: 0.7,
            ai_slope: 0.05,
            ai_cap: 0.9,
            human_intercept: 0.6,
            human_slope: 0.05,
        }
    }
}

impl ConfidencePolicy {
    pub fn confidence(&self, label: Label, score: u8) -> f64 {
        let score = f64::from(score);
        let raw = match label {
            Label::AiGenerated => (self.ai_intercept + self.ai_slope * score).min(self.ai_cap),
            Label::Human => self.human_intercept + self.human_slope * score,
        };
        if raw.is_finite() { raw.clamp(0.0, 1.0) } else { 0.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub label: Label,
    pub confidence: f64,
    pub score: u8,
    pub features: FeatureVector,
}

#[derive(Debug, Clone, Default)]
pub struct ThresholdClassifier {
    thresholds: Thresholds,
    policy: ConfidencePolicy,
}

impl ThresholdClassifier {
    pub fn new(thresholds: Thresholds, policy: ConfidencePolicy) -> Self {
        Self { thresholds, policy }
    }

    /// Number of features below their threshold, in `0..=3`.
    pub fn score(&self, features: &FeatureVector) -> u8 {
        [
            features.zero_crossing_rate < self.thresholds.zero_crossing_rate,
            features.energy_variance < self.thresholds.energy_variance,
            features.spectral_flatness < self.thresholds.spectral_flatness,
        ]
        .into_iter()
        .map(u8::from)
        .sum()
    }

    pub fn classify(&self, features: FeatureVector) -> Classification {
        let score = self.score(&features);
        let label = if score >= 2 {
            Label::AiGenerated
        } else {
            Label::Human
        };

        Classification {
            label,
            confidence: self.policy.confidence(label, score),
            score,
            features,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features(zcr: f64, variance: f64, flatness: f64) -> FeatureVector {
        FeatureVector {
            zero_crossing_rate: zcr,
            energy_variance: variance,
            spectral_flatness: flatness,
        }
    }

    #[test]
    fn score_counts_features_below_threshold() {
        let classifier = ThresholdClassifier::default();
        assert_eq!(classifier.score(&features(0.5, 0.5, 0.5)), 0);
        assert_eq!(classifier.score(&features(0.01, 0.5, 0.5)), 1);
        assert_eq!(classifier.score(&features(0.01, 0.001, 0.5)), 2);
        assert_eq!(classifier.score(&features(0.01, 0.001, 0.01)), 3);
    }

    #[test]
    fn thresholds_are_strict() {
        let classifier = ThresholdClassifier::default();
        assert_eq!(classifier.score(&features(0.08, 0.01, 0.2)), 0);
    }

    #[test]
    fn two_points_flip_the_label() {
        let classifier = ThresholdClassifier::default();
        assert_eq!(classifier.classify(features(0.5, 0.5, 0.01)).label, Label::Human);
        assert_eq!(
            classifier.classify(features(0.5, 0.001, 0.01)).label,
            Label::AiGenerated
        );
    }

    #[test]
    fn silence_like_features_are_ai_generated() {
        let result = ThresholdClassifier::default().classify(features(0.0, 0.0, 1.0));
        assert_eq!(result.score, 2);
        assert_eq!(result.label, Label::AiGenerated);
        assert!((result.confidence - 0.8).abs() < 1e-12);
    }

    #[test]
    fn default_confidence_table() {
        let classifier = ThresholdClassifier::default();
        let expected = [
            (0, Label::Human, 0.60),
            (1, Label::Human, 0.65),
            (2, Label::AiGenerated, 0.80),
            (3, Label::AiGenerated, 0.85),
        ];
        let cases = [
            features(0.5, 0.5, 0.5),
            features(0.01, 0.5, 0.5),
            features(0.01, 0.001, 0.5),
            features(0.01, 0.001, 0.01),
        ];
        for ((score, label, confidence), input) in expected.into_iter().zip(cases) {
            let result = classifier.classify(input);
            assert_eq!(result.score, score);
            assert_eq!(result.label, label);
            assert!((result.confidence - confidence).abs() < 1e-12, "{result:?}");
        }
    }

    #[test]
    fn confidence_is_bounded_and_monotonic_in_score() {
        let policy = ConfidencePolicy::default();
        let mut previous = f64::NEG_INFINITY;
        for score in 0..=3u8 {
            let label = if score >= 2 {
                Label::AiGenerated
            } else {
                Label::Human
            };
            let confidence = policy.confidence(label, score);
            assert!((0.0..=1.0).contains(&confidence));
            assert!(confidence >= previous, "score {score} dropped to {confidence}");
            previous = confidence;
        }
    }

    #[test]
    fn out_of_range_policy_is_clipped() {
        let policy = ConfidencePolicy {
            human_intercept: 1.5,
            ai_cap: 2.0,
            ai_intercept: -3.0,
            ..ConfidencePolicy::default()
        };
        assert_eq!(policy.confidence(Label::Human, 0), 1.0);
        assert_eq!(policy.confidence(Label::AiGenerated, 3), 0.0);
    }

    #[test]
    fn labels_serialize_in_kebab_case() {
        assert_eq!(
            serde_json::to_value(Label::AiGenerated).unwrap(),
            serde_json::json!("ai-generated")
        );
        assert_eq!(Label::Human.as_str(), "human");
    }
}
