//! # hook-relay HTTP service
//!
//! HTTP layer for receiving signed webhook deliveries and dispatching them
//! through the `hook-relay-core` pipeline.
//!
//! Every request, whatever its path or method, runs the same ordered
//! pipeline: route match, required headers, body drain, signature
//! verification, JSON decode. Success answers `200` and fans the event out
//! to the registered listeners; any failure answers `400` with a JSON error
//! body and an error-channel emission. The router therefore has a single
//! catch-all handler — route matching is a pipeline stage, not an axum
//! routing concern, so that route mismatches reach the error channel and the
//! completion callback like every other failure.

pub mod config;
pub mod errors;


use axum::{
    body::Body,
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use bytes::Bytes;
use crate::config::ServiceConfig;
use crate::errors::{HandlerError, ServiceError};
use hook_relay_core::{
    pipeline::{self, HookHeaders, DELIVERY_HEADER},
    EventData, EventDispatcher, PipelineError, RequestMeta, Signer,
};
use std::{collections::HashMap, net::SocketAddr, sync::Arc, time::Duration};
use tower_http::trace::TraceLayer;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Callback invoked once per request with the failure, or `None` on success.
///
/// Supports callers preferring completion-style signaling over event
/// listeners; invoked after the response outcome is decided.
pub type CompletionCallback = Arc<dyn Fn(Option<&PipelineError>) + Send + Sync>;

// ============================================================================
// Application State
// ============================================================================

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Service configuration, immutable after startup.
    pub config: ServiceConfig,

    /// HMAC signer holding the shared secret.
    pub signer: Arc<Signer>,

    /// Listener registry; the subscribe surface exposed to the embedding
    /// application.
    pub dispatcher: Arc<EventDispatcher>,

    /// Optional per-request completion callback.
    pub completion: Option<CompletionCallback>,
}

impl AppState {
    /// Create application state; the signer is built from the configured
    /// secret.
    pub fn new(
        config: ServiceConfig,
        dispatcher: Arc<EventDispatcher>,
        completion: Option<CompletionCallback>,
    ) -> Self {
        let signer = Arc::new(Signer::new(config.webhook.secret.clone()));
        Self {
            config,
            signer,
            dispatcher,
            completion,
        }
    }
}

// ============================================================================
// HTTP Server
// ============================================================================

/// Create the router: one catch-all handler plus request tracing.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .fallback(handle_webhook)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind the configured address and serve until shutdown.
///
/// # Errors
///
/// Returns [`ServiceError::BindFailed`] when the address cannot be bound —
/// fatal at startup — or [`ServiceError::ServerFailed`] for a serve-loop
/// failure.
pub async fn start_server(
    config: ServiceConfig,
    dispatcher: Arc<EventDispatcher>,
    completion: Option<CompletionCallback>,
) -> Result<(), ServiceError> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e: std::net::AddrParseError| ServiceError::BindFailed {
            address: format!("{}:{}", config.server.host, config.server.port),
            message: e.to_string(),
        })?;

    let listener =
        tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServiceError::BindFailed {
                address: addr.to_string(),
                message: e.to_string(),
            })?;

    serve(listener, config, dispatcher, completion).await
}

/// Serve on an externally supplied, already-bound listener.
///
/// The configured host and port are ignored; everything else behaves as in
/// [`start_server`].
///
/// # Errors
///
/// Returns [`ServiceError::BindFailed`] when the listener cannot be adopted
/// into the async runtime, or [`ServiceError::ServerFailed`] for a
/// serve-loop failure.
pub async fn serve_with_listener(
    listener: std::net::TcpListener,
    config: ServiceConfig,
    dispatcher: Arc<EventDispatcher>,
    completion: Option<CompletionCallback>,
) -> Result<(), ServiceError> {
    let address = listener
        .local_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "<external listener>".to_string());

    listener
        .set_nonblocking(true)
        .map_err(|e| ServiceError::BindFailed {
            address: address.clone(),
            message: e.to_string(),
        })?;

    let listener =
        tokio::net::TcpListener::from_std(listener).map_err(|e| ServiceError::BindFailed {
            address,
            message: e.to_string(),
        })?;

    serve(listener, config, dispatcher, completion).await
}

async fn serve(
    listener: tokio::net::TcpListener,
    config: ServiceConfig,
    dispatcher: Arc<EventDispatcher>,
    completion: Option<CompletionCallback>,
) -> Result<(), ServiceError> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, hook_path = %config.webhook.path, "hook-relay listening");
    }

    let shutdown_timeout = Duration::from_secs(config.server.shutdown_timeout_seconds);
    let state = AppState::new(config, dispatcher, completion);
    let app = create_router(state);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_timeout))
        .await
        .map_err(|e| ServiceError::ServerFailed {
            message: e.to_string(),
        })?;

    info!("HTTP server shutdown complete");
    Ok(())
}

async fn shutdown_signal(shutdown_timeout: Duration) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C signal handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!(
                "Received SIGINT (Ctrl+C), initiating graceful shutdown with {}s timeout",
                shutdown_timeout.as_secs()
            );
        },
        _ = terminate => {
            info!(
                "Received SIGTERM, initiating graceful shutdown with {}s timeout",
                shutdown_timeout.as_secs()
            );
        },
    }
}

// ============================================================================
// Webhook Handler
// ============================================================================

/// Handle one incoming request through the validation pipeline.
///
/// The pipeline races the configured deadline; whichever completes first
/// decides the response. When the deadline wins, the pipeline future is
/// dropped before it can emit, so a late result can never produce a second
/// response or a stray emission.
#[instrument(skip(state, request), fields(correlation_id = %Uuid::new_v4()))]
pub async fn handle_webhook(State(state): State<AppState>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let headers = lowercase_headers(&parts.headers);
    let meta = RequestMeta {
        method: parts.method.to_string(),
        path: parts.uri.to_string(),
        delivery_id: headers.get(&DELIVERY_HEADER.to_ascii_lowercase()).cloned(),
    };

    let deadline_seconds = state.config.server.timeout_seconds;
    let outcome = tokio::time::timeout(
        Duration::from_secs(deadline_seconds),
        process_request(&state, &meta, headers, body),
    )
    .await
    .unwrap_or(Err(PipelineError::DeadlineExceeded {
        seconds: deadline_seconds,
    }));

    match outcome {
        Ok(event) => {
            info!(
                event = %event.event,
                delivery_id = %event.delivery_id,
                "webhook delivery dispatched"
            );
            complete(&state, None);
            StatusCode::OK.into_response()
        }
        Err(failure) => {
            warn!(kind = failure.kind(), error = %failure, "webhook request failed");
            state.dispatcher.emit_error(&failure, &meta);
            complete(&state, Some(&failure));
            HandlerError(failure).into_response()
        }
    }
}

/// Run the ordered pipeline for one request.
///
/// Early checks (route, headers) run before the body is drained so a
/// request that cannot possibly be accepted never waits on its body stream.
/// Emission happens inside this future: if the deadline drops it, the event
/// is discarded rather than dispatched late.
async fn process_request(
    state: &AppState,
    meta: &RequestMeta,
    headers: HashMap<String, String>,
    body: Body,
) -> Result<EventData, PipelineError> {
    pipeline::match_route(&state.config.webhook.path, &meta.method, &meta.path)?;
    let hook_headers = HookHeaders::from_headers(&headers)?;

    let body = read_body(body, state.config.server.max_body_size).await?;

    let event = pipeline::complete_validation(&state.signer, &hook_headers, headers, &body)?;
    state.dispatcher.emit(&event);
    Ok(event)
}

/// Drain the request body into contiguous bytes, bounded by `limit`.
///
/// Resolves only once the stream ends, so later stages always see the full
/// transmitted byte sequence. Timeout policy belongs to the caller.
///
/// # Errors
///
/// Returns [`PipelineError::BodyRead`] on a stream error or when the body
/// exceeds `limit`.
pub async fn read_body(body: Body, limit: usize) -> Result<Bytes, PipelineError> {
    axum::body::to_bytes(body, limit)
        .await
        .map_err(|e| PipelineError::BodyRead {
            message: e.to_string(),
        })
}

/// Convert transport headers to a lower-cased name→value map.
///
/// Non-UTF-8 header values are dropped; the pipeline treats them as absent.
fn lowercase_headers(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
        })
        .collect()
}

fn complete(state: &AppState, failure: Option<&PipelineError>) {
    if let Some(callback) = &state.completion {
        callback(failure);
    }
}
