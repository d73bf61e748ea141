//! Errors on the forwarding path and their HTTP mapping.
//!
//! Every variant is reported to the caller as the same OpenAI-style envelope
//! with status 500. Non-2xx upstream replies are not errors; they are relayed.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

use crate::models::ErrorResponse;

/// Failure while forwarding a chat completion.
#[derive(Debug, Error)]
pub enum ForwardError {
    /// The inbound body is not valid JSON.
    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    /// The inbound body is valid JSON but not an object.
    #[error("Request body must be a JSON object")]
    BodyNotObject,

    /// The upstream call failed (connect, TLS, timeout, read).
    #[error("Upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),

    /// The upstream replied with a body that is not JSON.
    #[error("Upstream returned invalid JSON: {0}")]
    InvalidUpstreamBody(String),
}

impl IntoResponse for ForwardError {
    fn into_response(self) -> Response {
        error!("Failed to process chat completion request: {self}");

        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::internal(format!(
                "Failed to process request: {self}"
            ))),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_variant_maps_to_500() {
        let errors = [
            ForwardError::InvalidBody("expected value".into()),
            ForwardError::BodyNotObject,
            ForwardError::InvalidUpstreamBody("EOF".into()),
        ];
        for err in errors {
            assert_eq!(
                err.into_response().status(),
                StatusCode::INTERNAL_SERVER_ERROR
            );
        }
    }
}
