use std::sync::Arc;

use axum::{
    Router,
    extract::{DefaultBodyLimit, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::get,
};
use metrics::counter;

use crate::config::DEFAULT_MAX_BODY_BYTES;
use crate::engine::Engine;
use crate::error::DetectError;
use crate::types::{DetectionRequest, DetectionResponse, ProbeResponse};

pub const API_KEY_HEADER: &str = "x-api-key";

#[derive(Clone)]
pub struct AppState {
    engine: Arc<dyn Engine + Send + Sync>,
    api_key: Arc<str>,
    include_features: bool,
    max_body_bytes: usize,
}

impl AppState {
    pub fn new(
        engine: Arc<dyn Engine + Send + Sync>,
        api_key: impl Into<Arc<str>>,
        include_features: bool,
    ) -> Self {
        Self {
            engine,
            api_key: api_key.into(),
            include_features,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    fn authorize(&self, headers: &HeaderMap) -> Result<(), DetectError> {
        match headers.get(API_KEY_HEADER).map(|value| value.as_bytes()) {
            Some(provided) if provided == self.api_key.as_bytes() => Ok(()),
            _ => Err(DetectError::Unauthorized),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let body_limit = DefaultBodyLimit::max(state.max_body_bytes);
    Router::new()
        .route("/detect", get(probe_handler).post(detect_handler))
        .layer(body_limit)
        .with_state(state)
}

async fn probe_handler() -> Json<ProbeResponse> {
    Json(ProbeResponse {
        status: "ok",
        message: "Voice detection API is reachable",
    })
}

#[tracing::instrument(
    skip_all,
    fields(
        request_id = tracing::field::Empty,
        language = tracing::field::Empty,
        audio_format = tracing::field::Empty
    )
)]
async fn detect_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: Result<Json<DetectionRequest>, JsonRejection>,
) -> Result<Json<DetectionResponse>, DetectError> {
    counter!("detection_requests_total").increment(1);

    let result = detect(&state, &headers, request).await;
    match &result {
        Ok(response) => {
            counter!("detections_total", "label" => response.classification.as_str())
                .increment(1);
        }
        Err(e) => {
            counter!("detection_failures_total", "kind" => e.kind()).increment(1);
            tracing::warn!(kind = e.kind(), error = %e, "Detection request rejected");
        }
    }
    result.map(Json)
}

async fn detect(
    state: &AppState,
    headers: &HeaderMap,
    request: Result<Json<DetectionRequest>, JsonRejection>,
) -> Result<DetectionResponse, DetectError> {
    // Unauthorized callers never reach body validation or decoding.
    state.authorize(headers)?;
    let Json(request) = request.map_err(|e| match e.status() {
        StatusCode::PAYLOAD_TOO_LARGE => DetectError::PayloadTooLarge(state.max_body_bytes),
        _ => DetectError::InvalidRequest(e.body_text()),
    })?;

    let id = format!("detect-{}", uuid::Uuid::new_v4().simple());
    let span = tracing::Span::current();
    span.record("request_id", id.as_str());
    span.record("language", request.language.as_str());
    span.record("audio_format", request.audio_format.as_str());
    tracing::info!("Processing detection request");

    let result = state.engine.detect(request.audio_base64).await?;

    tracing::info!(
        label = result.label.as_str(),
        confidence = result.confidence,
        "Detection completed"
    );
    Ok(DetectionResponse::new(id, &result, state.include_features))
}
