//! Short-time acoustic features.
//!
//! Frames are centred on multiples of the hop length: the signal is padded by
//! `frame_length / 2` on each side and framed without a ragged tail, giving
//! `1 + (len + 2 * (frame_length / 2) - frame_length) / hop` frames. For even
//! frame lengths this is `1 + len / hop`.

use std::sync::Arc;

use realfft::{RealFftPlanner, RealToComplex};

use crate::decoder::AudioClip;
use crate::error::DetectError;

/// Power floor applied to every spectral bin before taking logarithms.
const POWER_FLOOR: f64 = 1e-10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameConfig {
    pub frame_length: usize,
    pub hop_length: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            frame_length: 2048,
            hop_length: 512,
        }
    }
}

/// The three statistics the classifier scores.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector {
    pub zero_crossing_rate: f64,
    pub energy_variance: f64,
    pub spectral_flatness: f64,
}

impl FeatureVector {
    pub fn is_finite(&self) -> bool {
        self.zero_crossing_rate.is_finite()
            && self.energy_variance.is_finite()
            && self.spectral_flatness.is_finite()
    }
}

enum Padding {
    Edge,
    Zero,
}

/// Computes a [`FeatureVector`] from a clip.
///
/// Holds a reusable FFT plan; per-call buffers are allocated locally so one
/// extractor can serve concurrent requests.
pub struct FeatureExtractor {
    frames: FrameConfig,
    fft: Arc<dyn RealToComplex<f64>>,
    window: Vec<f64>,
}

impl FeatureExtractor {
    pub fn new(frames: FrameConfig) -> Self {
        let mut planner = RealFftPlanner::<f64>::new();
        let fft = planner.plan_fft_forward(frames.frame_length);

        // Periodic Hann window
        let n = frames.frame_length as f64;
        let window = (0..frames.frame_length)
            .map(|i| 0.5 - 0.5 * (2.0 * std::f64::consts::PI * i as f64 / n).cos())
            .collect();

        Self {
            frames,
            fft,
            window,
        }
    }

    #[tracing::instrument(skip(self, clip), fields(samples = clip.samples.len(), sample_rate = clip.sample_rate))]
    pub fn extract(&self, clip: &AudioClip) -> Result<FeatureVector, DetectError> {
        if clip.samples.is_empty() {
            return Err(DetectError::Decode("audio contains no samples".into()));
        }

        let samples: Vec<f64> = clip.samples.iter().map(|&s| f64::from(s)).collect();
        if let Some(index) = samples.iter().position(|s| !s.is_finite()) {
            return Err(DetectError::Computation(format!(
                "sample {index} is not a finite number"
            )));
        }

        let features = FeatureVector {
            zero_crossing_rate: self.zero_crossing_rate(&samples),
            energy_variance: energy_variance(&samples),
            spectral_flatness: self.spectral_flatness(&samples)?,
        };

        if !features.is_finite() {
            return Err(DetectError::Computation(format!(
                "features are not finite: {features:?}"
            )));
        }

        tracing::debug!(?features, "Extracted features");
        Ok(features)
    }

    /// Mean over frames of the fraction of adjacent sample pairs whose signs
    /// differ. Zero counts as positive.
    fn zero_crossing_rate(&self, samples: &[f64]) -> f64 {
        let padded = self.centred(samples, Padding::Edge);
        let pairs = (self.frames.frame_length - 1) as f64;

        let rates: Vec<f64> = self
            .frame_starts(samples.len())
            .map(|start| {
                let frame = &padded[start..start + self.frames.frame_length];
                let crossings = frame
                    .windows(2)
                    .filter(|pair| (pair[0] >= 0.0) != (pair[1] >= 0.0))
                    .count();
                crossings as f64 / pairs
            })
            .collect();

        mean(&rates)
    }

    /// Mean over frames of the geometric to arithmetic mean ratio of the
    /// windowed power spectrum.
    fn spectral_flatness(&self, samples: &[f64]) -> Result<f64, DetectError> {
        let padded = self.centred(samples, Padding::Zero);
        let mut input = self.fft.make_input_vec();
        let mut spectrum = self.fft.make_output_vec();
        let mut scratch = self.fft.make_scratch_vec();
        let mut flatness = Vec::new();

        for start in self.frame_starts(samples.len()) {
            let frame = &padded[start..start + self.frames.frame_length];
            for ((slot, &sample), &w) in input.iter_mut().zip(frame).zip(&self.window) {
                *slot = sample * w;
            }

            self.fft
                .process_with_scratch(&mut input, &mut spectrum, &mut scratch)
                .map_err(|e| DetectError::Computation(format!("fft failed: {e}")))?;

            let bins = spectrum.len() as f64;
            let (log_sum, sum) = spectrum
                .iter()
                .map(|c| (c.re * c.re + c.im * c.im).max(POWER_FLOOR))
                .fold((0.0, 0.0), |(log_sum, sum), power| {
                    (log_sum + power.ln(), sum + power)
                });

            let geometric_mean = (log_sum / bins).exp();
            let arithmetic_mean = sum / bins;
            flatness.push(geometric_mean / arithmetic_mean);
        }

        Ok(mean(&flatness))
    }

    fn frame_starts(&self, len: usize) -> impl Iterator<Item = usize> {
        let padded_len = len + 2 * (self.frames.frame_length / 2);
        let count = 1 + padded_len.saturating_sub(self.frames.frame_length) / self.frames.hop_length;
        let hop = self.frames.hop_length;
        (0..count).map(move |i| i * hop)
    }

    fn centred(&self, samples: &[f64], padding: Padding) -> Vec<f64> {
        let pad = self.frames.frame_length / 2;
        let (head, tail) = match padding {
            Padding::Edge => (
                samples.first().copied().unwrap_or_default(),
                samples.last().copied().unwrap_or_default(),
            ),
            Padding::Zero => (0.0, 0.0),
        };

        let mut padded = Vec::with_capacity(samples.len() + 2 * pad);
        padded.extend(std::iter::repeat_n(head, pad));
        padded.extend_from_slice(samples);
        padded.extend(std::iter::repeat_n(tail, pad));
        padded
    }
}

/// Population variance of the raw amplitudes.
pub fn energy_variance(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let mean = mean(samples);
    samples.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / samples.len() as f64
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}
