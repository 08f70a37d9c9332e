//! # hook-relay core
//!
//! Validation pipeline and event dispatch for incoming webhook deliveries.
//!
//! A delivery moves through an ordered sequence of checks — route match,
//! required headers, signature verification, JSON decode — and, when every
//! check passes, fans out to registered listeners as an [`EventData`] record.
//! Any failure short-circuits the pipeline with a [`PipelineError`] that the
//! HTTP layer converts into a `400` response and an error-channel emission.
//!
//! The crate is transport-agnostic: the HTTP server (in `hook-relay-service`)
//! drains the request body and hands the raw bytes to [`pipeline::validate`],
//! so signature verification always operates on the exact transmitted bytes.

pub mod dispatcher;
pub mod pipeline;
pub mod signer;

pub use dispatcher::EventDispatcher;
pub use pipeline::HookRequest;
pub use signer::Signer;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

// ============================================================================
// Core Types
// ============================================================================

/// The record delivered to every matching listener for a validated webhook.
///
/// Constructed once per successfully validated request and passed by
/// reference to each listener in turn. Listeners must not assume the record
/// outlives the dispatch call; clone what they need to retain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventData {
    /// Event name, echoed verbatim from the `X-GitHub-Event` header.
    pub event: String,

    /// Opaque per-delivery identifier from the `X-GitHub-Delivery` header.
    pub delivery_id: String,

    /// Decoded JSON payload. Shape is provider-defined and opaque here.
    pub payload: serde_json::Value,

    /// All request headers, lower-cased names.
    pub headers: HashMap<String, String>,

    /// When the delivery was received.
    pub received_at: DateTime<Utc>,
}

impl EventData {
    /// Create a new event record stamped with the current time.
    pub fn new(
        event: String,
        delivery_id: String,
        payload: serde_json::Value,
        headers: HashMap<String, String>,
    ) -> Self {
        Self {
            event,
            delivery_id,
            payload,
            headers,
            received_at: Utc::now(),
        }
    }
}

/// Metadata describing the request a pipeline failure originated from.
///
/// Passed to error-channel listeners alongside the [`PipelineError`] so they
/// can correlate failures with deliveries without access to the transport
/// request itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestMeta {
    /// HTTP method of the originating request.
    pub method: String,

    /// Request path as received, query string included.
    pub path: String,

    /// Delivery identifier, when the request got far enough to carry one.
    pub delivery_id: Option<String>,
}

// ============================================================================
// Error Types
// ============================================================================

/// Failure taxonomy for the webhook validation pipeline.
///
/// All variants are recoverable per request: the HTTP layer answers `400`,
/// emits the failure on the error channel, and the process keeps serving.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The request did not match the configured path-and-method route.
    #[error("no hook configured for {method} {path}")]
    RouteMismatch { method: String, path: String },

    /// A required header was absent. Headers are checked in a fixed order
    /// (signature, event, delivery id) and the first absent one is named.
    #[error("No {header} found on request")]
    MissingHeader { header: &'static str },

    /// The request body stream failed or exceeded the configured size cap
    /// before it could be fully drained.
    #[error("failed to read request body: {message}")]
    BodyRead { message: String },

    /// The `X-Hub-Signature` value did not match the HMAC of the received
    /// body bytes under the configured secret.
    #[error("X-Hub-Signature verify failure")]
    SignatureMismatch,

    /// The body was not a well-formed JSON document.
    #[error("payload is not valid JSON: {0}")]
    PayloadParse(#[from] serde_json::Error),

    /// The request deadline elapsed before the pipeline completed.
    #[error("request timed out after {seconds}s")]
    DeadlineExceeded { seconds: u64 },
}

impl PipelineError {
    /// Stable name for the failure kind, used in logs and listener filtering.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RouteMismatch { .. } => "route_mismatch",
            Self::MissingHeader { .. } => "missing_header",
            Self::BodyRead { .. } => "body_read",
            Self::SignatureMismatch => "signature_mismatch",
            Self::PayloadParse(_) => "payload_parse",
            Self::DeadlineExceeded { .. } => "deadline_exceeded",
        }
    }
}
