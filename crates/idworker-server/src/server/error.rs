//! Error types for the HTTP surface.
//!
//! `ApiError` maps generator and request failures onto status codes:
//! - `Generation` with a clock regression: `503` plus `retry-after`, so the
//!   caller treats the create as failed and may retry later.
//! - any other `Generation` error: `500`.
//! - `InvalidRequest` / `InvalidId`: `400`.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use idworker::ParseIdError;
use serde::Serialize;

pub type Result<T> = core::result::Result<T, ApiError>;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The generator refused to produce an ID.
    #[error(transparent)]
    Generation(#[from] idworker::Error),

    /// The request was malformed or exceeded configured limits.
    #[error("invalid request: {reason}")]
    InvalidRequest { reason: String },

    /// A path parameter did not hold a valid ID.
    #[error(transparent)]
    InvalidId(#[from] ParseIdError),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, retry_after) = match &self {
            Self::Generation(err) => match err.clock_regression() {
                Some(regression) => {
                    tracing::warn!(
                        regression_ms = regression.millis(),
                        "id generation refused: clock moved backwards"
                    );
                    // Whole seconds, rounded up, never zero.
                    let secs = regression.millis().div_ceil(1_000).max(1);
                    (StatusCode::SERVICE_UNAVAILABLE, Some(secs))
                }
                None => {
                    tracing::error!(error = %err, "id generation failed");
                    (StatusCode::INTERNAL_SERVER_ERROR, None)
                }
            },
            Self::InvalidRequest { .. } | Self::InvalidId(_) => {
                tracing::debug!(error = %self, "rejected request");
                (StatusCode::BAD_REQUEST, None)
            }
        };

        let body = ErrorBody {
            error: self.to_string(),
        };
        let mut response = (status, Json(body)).into_response();
        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}
