use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use thiserror::Error;

/// Terminal failure of a detection request.
#[derive(Debug, Error)]
pub enum DetectError {
    #[error("invalid api key")]
    Unauthorized,

    #[error("invalid request body: {0}")]
    InvalidRequest(String),

    #[error("request body exceeds {0} bytes")]
    PayloadTooLarge(usize),

    #[error("invalid or corrupted audio: {0}")]
    Decode(String),

    /// Decoding succeeded but the signal could not be analysed, e.g. it held
    /// non-finite samples. Reported to callers like a decode failure.
    #[error("invalid or corrupted audio: {0}")]
    Computation(String),
}

impl DetectError {
    /// Short label used for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::InvalidRequest(_) => "invalid_request",
            Self::PayloadTooLarge(_) => "payload_too_large",
            Self::Decode(_) => "decode",
            Self::Computation(_) => "computation",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::InvalidRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Decode(_) | Self::Computation(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<base64::DecodeError> for DetectError {
    fn from(err: base64::DecodeError) -> Self {
        Self::Decode(format!("payload is not valid base64: {err}"))
    }
}

impl From<symphonia::core::errors::Error> for DetectError {
    fn from(err: symphonia::core::errors::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

impl IntoResponse for DetectError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn computation_failures_surface_as_client_errors() {
        let err = DetectError::Computation("non-finite sample".into());
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.status(), DetectError::Decode(String::new()).status());
        assert_eq!(err.kind(), "computation");
    }

    #[test]
    fn base64_errors_become_decode_errors() {
        let err: DetectError = base64::DecodeError::InvalidLength(3).into();
        assert!(matches!(err, DetectError::Decode(_)));
    }
}
