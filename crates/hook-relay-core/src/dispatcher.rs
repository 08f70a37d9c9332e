//! Event dispatch to registered listeners.
//!
//! [`EventDispatcher`] is an observer registry keyed by event name, plus a
//! reserved wildcard key and a separate error channel. Dispatch is
//! synchronous and preserves registration order; a panicking listener is
//! isolated and logged so it cannot suppress its siblings.

use crate::{EventData, PipelineError, RequestMeta};
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, RwLock};
use tracing::{debug, error};

/// Reserved event name receiving every successfully validated event.
pub const WILDCARD_EVENT: &str = "*";

/// Listener invoked with the event record for a validated delivery.
pub type EventListener = Arc<dyn Fn(&EventData) + Send + Sync>;

/// Listener invoked with a pipeline failure and its originating request.
pub type ErrorListener = Arc<dyn Fn(&PipelineError, &RequestMeta) + Send + Sync>;

// ============================================================================
// EventDispatcher
// ============================================================================

/// Observer registry with wildcard and error channels.
///
/// Listeners may be registered at any time, including while the server is
/// already dispatching: the registry is behind an `RwLock` and dispatch only
/// takes a read guard. Within one channel, listeners run in registration
/// order; there is no ordering guarantee between distinct concurrent
/// requests' emissions.
///
/// # Examples
///
/// ```rust
/// use hook_relay_core::EventDispatcher;
///
/// let dispatcher = EventDispatcher::new();
/// dispatcher.on("push", |event| {
///     println!("push delivery {}", event.delivery_id);
/// });
/// dispatcher.on("*", |event| {
///     println!("any delivery: {}", event.event);
/// });
/// ```
#[derive(Default)]
pub struct EventDispatcher {
    listeners: RwLock<HashMap<String, Vec<EventListener>>>,
    error_listeners: RwLock<Vec<ErrorListener>>,
}

impl EventDispatcher {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener for `event`, or for every validated event when
    /// `event` is [`WILDCARD_EVENT`]. Multiple listeners per name are
    /// permitted; insertion order is notification order.
    pub fn on(&self, event: impl Into<String>, listener: impl Fn(&EventData) + Send + Sync + 'static) {
        let mut registry = match self.listeners.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        registry
            .entry(event.into())
            .or_default()
            .push(Arc::new(listener));
    }

    /// Register a listener on the error channel.
    pub fn on_error(
        &self,
        listener: impl Fn(&PipelineError, &RequestMeta) + Send + Sync + 'static,
    ) {
        let mut registry = match self.error_listeners.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        registry.push(Arc::new(listener));
    }

    /// Remove every listener registered under `event`, returning how many
    /// were dropped.
    pub fn remove_listeners(&self, event: &str) -> usize {
        let mut registry = match self.listeners.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        registry.remove(event).map(|l| l.len()).unwrap_or(0)
    }

    /// Number of listeners currently registered under `event`.
    pub fn listener_count(&self, event: &str) -> usize {
        let registry = match self.listeners.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        registry.get(event).map(Vec::len).unwrap_or(0)
    }

    /// Notify the listeners for `data.event`, then the wildcard listeners.
    ///
    /// Each registered listener is invoked exactly once, synchronously, in
    /// registration order. A listener that panics is caught and logged;
    /// subsequent listeners still run.
    pub fn emit(&self, data: &EventData) {
        // Clone the Arcs out and release the guard before invoking anything,
        // so a listener can register further listeners without deadlocking.
        let batch: Vec<EventListener> = {
            let registry = match self.listeners.read() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            // Guard against an event literally named "*": its listeners
            // must still fire exactly once.
            let wildcard = (data.event != WILDCARD_EVENT)
                .then(|| registry.get(WILDCARD_EVENT))
                .flatten();
            registry
                .get(&data.event)
                .into_iter()
                .chain(wildcard)
                .flatten()
                .cloned()
                .collect()
        };

        debug!(event = %data.event, listeners = batch.len(), "dispatching event");

        for listener in batch {
            if catch_unwind(AssertUnwindSafe(|| listener(data))).is_err() {
                error!(
                    event = %data.event,
                    delivery_id = %data.delivery_id,
                    "event listener panicked; continuing with remaining listeners"
                );
            }
        }
    }

    /// Notify the error channel of a pipeline failure.
    ///
    /// Same ordering and isolation rules as [`emit`](Self::emit).
    pub fn emit_error(&self, failure: &PipelineError, meta: &RequestMeta) {
        let batch: Vec<ErrorListener> = {
            let registry = match self.error_listeners.read() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            registry.iter().cloned().collect()
        };

        for listener in batch {
            if catch_unwind(AssertUnwindSafe(|| listener(failure, meta))).is_err() {
                error!(
                    kind = failure.kind(),
                    method = %meta.method,
                    path = %meta.path,
                    "error listener panicked; continuing with remaining listeners"
                );
            }
        }
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let events = match self.listeners.read() {
            Ok(guard) => guard.len(),
            Err(_) => 0,
        };
        f.debug_struct("EventDispatcher")
            .field("event_keys", &events)
            .finish()
    }
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
