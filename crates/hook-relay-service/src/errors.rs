//! Error types for the HTTP service.
//!
//! [`HandlerError`] is the per-request failure surface: every pipeline
//! failure maps to the same hardened response contract, `400 Bad Request`
//! with a JSON `{"error": "<message>"}` body. [`ServiceError`] covers
//! startup-fatal conditions (bind failure, broken configuration) and maps to
//! process exit codes in `main`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use hook_relay_core::PipelineError;
use tracing::{debug, warn};

// ============================================================================
// HandlerError
// ============================================================================

/// Per-request handler failure, answered with `400` and a JSON error body.
///
/// The legacy behaviour of silently dropping non-matching-route requests is
/// deliberately not reproduced: every failure kind, route mismatch included,
/// gets an explicit response so clients never hang on an unanswered
/// connection.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct HandlerError(#[from] pub PipelineError);

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        match &self.0 {
            // Signature failures are the security-relevant case; log louder.
            PipelineError::SignatureMismatch => {
                warn!(kind = self.0.kind(), "rejected webhook delivery");
            }
            other => {
                debug!(kind = other.kind(), error = %other, "rejected webhook request");
            }
        }

        let body = serde_json::json!({
            "error": self.0.to_string(),
        });

        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    }
}

// ============================================================================
// ServiceError
// ============================================================================

/// Startup-fatal service errors.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Failed to bind to address {address}: {message}")]
    BindFailed { address: String, message: String },

    #[error("Server failed: {message}")]
    ServerFailed { message: String },

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Configuration loading failed: {0}")]
    Load(#[from] config::ConfigError),
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;
