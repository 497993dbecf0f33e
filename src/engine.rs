use std::sync::Arc;

use async_trait::async_trait;

use crate::classifier::{Classification, ThresholdClassifier};
use crate::decoder::{decode_audio, decode_base64};
use crate::error::DetectError;
use crate::features::FeatureExtractor;

#[async_trait]
pub trait Engine {
    /// Decode a base64 audio payload and classify it.
    async fn detect(&self, audio_base64: String) -> Result<Classification, DetectError>;
}

/// Decodes, extracts features and scores them on the blocking pool.
pub struct FeatureEngine {
    extractor: Arc<FeatureExtractor>,
    classifier: Arc<ThresholdClassifier>,
}

impl FeatureEngine {
    pub fn new(extractor: FeatureExtractor, classifier: ThresholdClassifier) -> Self {
        Self {
            extractor: Arc::new(extractor),
            classifier: Arc::new(classifier),
        }
    }

    fn run(
        extractor: &FeatureExtractor,
        classifier: &ThresholdClassifier,
        audio_base64: &str,
    ) -> Result<Classification, DetectError> {
        let bytes = decode_base64(audio_base64)?;
        let clip = decode_audio(bytes)?;
        let features = extractor.extract(&clip)?;
        Ok(classifier.classify(features))
    }
}

#[async_trait]
impl Engine for FeatureEngine {
    #[tracing::instrument(skip(self, audio_base64), fields(payload_len = audio_base64.len()))]
    async fn detect(&self, audio_base64: String) -> Result<Classification, DetectError> {
        let extractor = Arc::clone(&self.extractor);
        let classifier = Arc::clone(&self.classifier);

        let result = tokio::task::spawn_blocking(move || {
            Self::run(&extractor, &classifier, &audio_base64)
        })
        .await
        .map_err(|e| DetectError::Computation(format!("analysis task failed: {e}")))??;

        tracing::debug!(
            label = result.label.as_str(),
            score = result.score,
            confidence = result.confidence,
            "Detection finished"
        );
        Ok(result)
    }
}
