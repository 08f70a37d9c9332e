//! Ordered request validation pipeline.
//!
//! A delivery passes through a fixed sequence of checks, short-circuiting at
//! the first failure:
//!
//! 1. Route match ([`match_route`]) — query string stripped, method must be
//!    `POST`, path must equal the configured hook path.
//! 2. Required headers ([`HookHeaders::from_headers`]) — `X-Hub-Signature`,
//!    `X-GitHub-Event`, `X-GitHub-Delivery`, checked in that order; the
//!    first absent one names the failure.
//! 3. Body drain — performed by the transport layer between stages 2 and 4,
//!    so the early checks never wait on the body stream and signature
//!    verification sees the exact transmitted bytes. A read failure arrives
//!    as [`PipelineError::BodyRead`].
//! 4. Signature + payload ([`complete_validation`]) — HMAC-SHA1 over the raw
//!    body, then a strict JSON decode.
//!
//! [`validate`] composes all stages for a request whose body is already
//! buffered.

use crate::{signer::Signer, EventData, PipelineError};
use bytes::Bytes;
use std::collections::HashMap;
use tracing::{debug, instrument};

/// Header carrying the `sha1=<hex>` HMAC signature.
pub const SIGNATURE_HEADER: &str = "X-Hub-Signature";

/// Header carrying the event name, echoed verbatim as the emission key.
pub const EVENT_HEADER: &str = "X-GitHub-Event";

/// Header carrying the opaque per-delivery identifier.
pub const DELIVERY_HEADER: &str = "X-GitHub-Delivery";

// ============================================================================
// HookRequest
// ============================================================================

/// Transport-level request data as seen by the composed pipeline.
///
/// Owned snapshot of the parts the pipeline reads: method, original URI
/// (query string included), headers, and the fully drained body bytes.
#[derive(Debug, Clone)]
pub struct HookRequest {
    method: String,
    uri: String,
    headers: HashMap<String, String>,
    body: Bytes,
}

impl HookRequest {
    /// Create a request snapshot.
    ///
    /// `uri` is the request target as received (path plus optional query
    /// string); the pipeline strips the query itself. Header names may be in
    /// any case.
    pub fn new(
        method: impl Into<String>,
        uri: impl Into<String>,
        headers: HashMap<String, String>,
        body: Bytes,
    ) -> Self {
        Self {
            method: method.into(),
            uri: uri.into(),
            headers,
            body,
        }
    }

    /// HTTP method as received.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Request target as received, query string included.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// All request headers.
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Raw body bytes, exactly as transmitted.
    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

// ============================================================================
// Hook headers
// ============================================================================

/// The three provider headers every delivery must carry.
#[derive(Debug, Clone)]
pub struct HookHeaders {
    /// `X-Hub-Signature` value, `sha1=<hex>`.
    pub signature: String,

    /// `X-GitHub-Event` value, the emission key.
    pub event: String,

    /// `X-GitHub-Delivery` value, opaque per-delivery id.
    pub delivery_id: String,
}

impl HookHeaders {
    /// Extract the required headers from an HTTP header map.
    ///
    /// Lookup is case-insensitive. Presence is checked in the fixed order
    /// signature, event, delivery id; the first absent header names the
    /// failure.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::MissingHeader`] for the first absent header.
    pub fn from_headers(headers: &HashMap<String, String>) -> Result<Self, PipelineError> {
        let signature = required(headers, SIGNATURE_HEADER)?;
        let event = required(headers, EVENT_HEADER)?;
        let delivery_id = required(headers, DELIVERY_HEADER)?;

        Ok(Self {
            signature,
            event,
            delivery_id,
        })
    }
}

fn required(headers: &HashMap<String, String>, name: &'static str) -> Result<String, PipelineError> {
    // The HTTP layer hands over lower-cased names, so the direct lookup is the
    // common path; the scan covers callers that pass any other casing.
    headers
        .get(&name.to_ascii_lowercase())
        .or_else(|| {
            headers
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value)
        })
        .cloned()
        .ok_or(PipelineError::MissingHeader { header: name })
}

// ============================================================================
// Pipeline stages
// ============================================================================

/// Stage 1: route match, query string ignored.
///
/// # Errors
///
/// Returns [`PipelineError::RouteMismatch`] unless the method is `POST` and
/// the query-stripped path equals `hook_path`.
pub fn match_route(hook_path: &str, method: &str, uri: &str) -> Result<(), PipelineError> {
    let path = uri.split_once('?').map(|(path, _query)| path).unwrap_or(uri);

    if path != hook_path || !method.eq_ignore_ascii_case("POST") {
        return Err(PipelineError::RouteMismatch {
            method: method.to_string(),
            path: uri.to_string(),
        });
    }

    Ok(())
}

/// Stages 4–5: verify the signature over the exact raw body bytes, then
/// decode the payload and build the [`EventData`] record.
///
/// Exactly one signature check occurs per request, and it runs over the
/// bytes as transmitted, never a re-serialized form.
///
/// # Errors
///
/// Returns [`PipelineError::SignatureMismatch`] or
/// [`PipelineError::PayloadParse`].
pub fn complete_validation(
    signer: &Signer,
    hook_headers: &HookHeaders,
    all_headers: HashMap<String, String>,
    body: &[u8],
) -> Result<EventData, PipelineError> {
    if !signer.verify(&hook_headers.signature, body) {
        return Err(PipelineError::SignatureMismatch);
    }

    let payload = parse_payload(body)?;

    debug!(
        event = %hook_headers.event,
        delivery_id = %hook_headers.delivery_id,
        "webhook delivery validated"
    );

    Ok(EventData::new(
        hook_headers.event.clone(),
        hook_headers.delivery_id.clone(),
        payload,
        all_headers,
    ))
}

/// Run the full pipeline for a request whose body is already buffered.
///
/// # Errors
///
/// Returns the [`PipelineError`] variant for the first failing stage.
#[instrument(skip(signer, request), fields(method = %request.method(), uri = %request.uri()))]
pub fn validate(
    hook_path: &str,
    signer: &Signer,
    request: &HookRequest,
) -> Result<EventData, PipelineError> {
    match_route(hook_path, request.method(), request.uri())?;
    let hook_headers = HookHeaders::from_headers(request.headers())?;
    complete_validation(
        signer,
        &hook_headers,
        request.headers().clone(),
        request.body(),
    )
}

/// Decode the raw body as a JSON document.
///
/// Well-formedness only; payload shape is provider-defined and opaque.
///
/// # Errors
///
/// Returns [`PipelineError::PayloadParse`] carrying the decode error.
pub fn parse_payload(body: &[u8]) -> Result<serde_json::Value, PipelineError> {
    Ok(serde_json::from_slice(body)?)
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
