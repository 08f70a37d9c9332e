//! Shared helpers for driving the hook-relay router in tests.

use axum::body::{to_bytes, Body};
use axum::http::Request;
use axum::response::Response;
use hook_relay_core::{EventData, EventDispatcher, Signer};
use hook_relay_service::config::ServiceConfig;
use hook_relay_service::{AppState, CompletionCallback};
use std::sync::{Arc, Mutex};

pub const SECRET: &str = "integration-secret";
pub const HOOK_PATH: &str = "/hook";

/// Everything the recording listeners captured during a test.
pub struct Recorded {
    pub named: Arc<Mutex<Vec<EventData>>>,
    pub wildcard: Arc<Mutex<Vec<EventData>>>,
    pub errors: Arc<Mutex<Vec<String>>>,
    pub completions: Arc<Mutex<Vec<Option<String>>>>,
}

impl Recorded {
    pub fn error_count(&self) -> usize {
        self.errors.lock().unwrap().len()
    }
}

/// Build an [`AppState`] with recording listeners for `event_name`, the
/// wildcard channel, and the error channel, plus a recording completion
/// callback.
pub fn recording_state(event_name: &str) -> (AppState, Recorded) {
    let mut config = ServiceConfig::default();
    config.webhook.path = HOOK_PATH.to_string();
    config.webhook.secret = SECRET.to_string();

    let dispatcher = Arc::new(EventDispatcher::new());
    let named = Arc::new(Mutex::new(Vec::new()));
    let wildcard = Arc::new(Mutex::new(Vec::new()));
    let errors = Arc::new(Mutex::new(Vec::new()));
    let completions = Arc::new(Mutex::new(Vec::new()));

    {
        let named = Arc::clone(&named);
        dispatcher.on(event_name, move |event| {
            named.lock().unwrap().push(event.clone());
        });
    }
    {
        let wildcard = Arc::clone(&wildcard);
        dispatcher.on("*", move |event| {
            wildcard.lock().unwrap().push(event.clone());
        });
    }
    {
        let errors = Arc::clone(&errors);
        dispatcher.on_error(move |failure, _meta| {
            errors.lock().unwrap().push(failure.kind().to_string());
        });
    }

    let completion: CompletionCallback = {
        let completions = Arc::clone(&completions);
        Arc::new(move |failure| {
            completions
                .lock()
                .unwrap()
                .push(failure.map(|f| f.kind().to_string()));
        })
    };

    let state = AppState::new(config, dispatcher, Some(completion));
    (
        state,
        Recorded {
            named,
            wildcard,
            errors,
            completions,
        },
    )
}

/// Sign `body` with the shared test secret.
pub fn sign(body: &str) -> String {
    Signer::new(SECRET).sign(body.as_bytes())
}

/// Build a fully valid `POST` delivery request.
pub fn signed_request(event: &str, delivery_id: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(HOOK_PATH)
        .header("X-Hub-Signature", sign(body))
        .header("X-GitHub-Event", event)
        .header("X-GitHub-Delivery", delivery_id)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Collect a response body as a JSON value.
pub async fn response_json(response: Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
