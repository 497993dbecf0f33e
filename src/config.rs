use anyhow::{Result, bail, ensure};
use clap::Parser;
use std::fmt;

use crate::classifier::Thresholds;
use crate::features::FrameConfig;

/// Base64 inflates audio by a third, so this admits several minutes of CD audio.
pub const DEFAULT_MAX_BODY_BYTES: usize = 50 * 1024 * 1024;

#[derive(Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Server host to bind to
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Server port to bind to
    #[arg(long, env = "PORT", default_value = "8000")]
    pub port: u16,

    /// Secret expected in the x-api-key header
    #[arg(long, env = "API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// Analysis frame length in samples
    #[arg(long, env = "FRAME_LENGTH", default_value = "2048")]
    pub frame_length: usize,

    /// Hop between consecutive analysis frames in samples
    #[arg(long, env = "HOP_LENGTH", default_value = "512")]
    pub hop_length: usize,

    /// Zero-crossing rate below which a clip scores a point
    #[arg(long, env = "ZCR_THRESHOLD", default_value = "0.08")]
    pub zcr_threshold: f64,

    /// Amplitude variance below which a clip scores a point
    #[arg(long, env = "VARIANCE_THRESHOLD", default_value = "0.01")]
    pub variance_threshold: f64,

    /// Spectral flatness below which a clip scores a point
    #[arg(long, env = "FLATNESS_THRESHOLD", default_value = "0.2")]
    pub flatness_threshold: f64,

    /// Return the raw feature values alongside the label
    #[arg(long, env = "INCLUDE_FEATURES", default_value = "true", action = clap::ArgAction::Set)]
    pub include_features: bool,

    /// Largest accepted request body in bytes
    #[arg(long, env = "MAX_BODY_BYTES", default_value_t = DEFAULT_MAX_BODY_BYTES)]
    pub max_body_bytes: usize,

    /// Allow cross-origin requests from any origin
    #[arg(long, env = "CORS_PERMISSIVE", default_value = "true", action = clap::ArgAction::Set)]
    pub cors_permissive: bool,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("api_key", &"<redacted>")
            .field("frame_length", &self.frame_length)
            .field("hop_length", &self.hop_length)
            .field("zcr_threshold", &self.zcr_threshold)
            .field("variance_threshold", &self.variance_threshold)
            .field("flatness_threshold", &self.flatness_threshold)
            .field("include_features", &self.include_features)
            .field("max_body_bytes", &self.max_body_bytes)
            .field("cors_permissive", &self.cors_permissive)
            .finish()
    }
}

impl From<&Config> for FrameConfig {
    fn from(config: &Config) -> Self {
        Self {
            frame_length: config.frame_length,
            hop_length: config.hop_length,
        }
    }
}

impl From<&Config> for Thresholds {
    fn from(config: &Config) -> Self {
        Self {
            zero_crossing_rate: config.zcr_threshold,
            energy_variance: config.variance_threshold,
            spectral_flatness: config.flatness_threshold,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.api_key.is_empty() {
            bail!("--api-key must not be empty");
        }
        ensure!(
            self.frame_length >= 2,
            "--frame-length must be at least 2, got {}",
            self.frame_length
        );
        ensure!(
            self.hop_length >= 1 && self.hop_length <= self.frame_length,
            "--hop-length must be between 1 and the frame length, got {}",
            self.hop_length
        );
        ensure!(self.max_body_bytes > 0, "--max-body-bytes must be positive");
        for (name, value) in [
            ("--zcr-threshold", self.zcr_threshold),
            ("--variance-threshold", self.variance_threshold),
            ("--flatness-threshold", self.flatness_threshold),
        ] {
            ensure!(
                value.is_finite() && value > 0.0,
                "{name} must be a positive number, got {value}"
            );
        }
        Ok(())
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
