mod classifier;
mod config;
mod decoder;
mod engine;
mod error;
mod features;
mod routes;
mod types;

use axum::routing::get;
use axum_prometheus::PrometheusMetricLayer;
use clap::Parser;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use classifier::{ConfidencePolicy, ThresholdClassifier, Thresholds};
use config::Config;
use engine::FeatureEngine;
use features::{FeatureExtractor, FrameConfig};
use routes::{AppState, build_router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,voicecheck=debug".into()),
        )
        .init();

    let config = Config::parse();
    tracing::info!("Starting voice detection server with config: {:?}", config);
    config.validate()?;

    let frames = FrameConfig::from(&config);
    let thresholds = Thresholds::from(&config);
    let policy = ConfidencePolicy::default();
    tracing::info!(?frames, ?thresholds, ?policy, "Classifier configured");

    let engine = FeatureEngine::new(
        FeatureExtractor::new(frames),
        ThresholdClassifier::new(thresholds, policy),
    );
    let state = AppState::new(
        Arc::new(engine),
        config.api_key.as_str(),
        config.include_features,
    )
    .with_max_body_bytes(config.max_body_bytes);

    let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();

    let mut app = build_router(state)
        .route("/metrics", get(|| async move { metric_handle.render() }))
        .layer(prometheus_layer)
        .layer(TraceLayer::new_for_http());
    if config.cors_permissive {
        app = app.layer(CorsLayer::permissive());
    }

    let listener = TcpListener::bind(&config.server_address()).await?;
    tracing::info!("Server running on http://{}", config.server_address());

    axum::serve(listener, app).await?;
    Ok(())
}
