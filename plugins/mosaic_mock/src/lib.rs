//! Mosaic mock plugin.
//!
//! Modules contribute mocked request handlers while they register; the host
//! starts its mock server once modules are ready and marks the plugin
//! started, after which no more handlers are accepted. The server state is
//! owned by the plugin instance, so separate runtimes (and tests) never share
//! it.

mod handler;

use std::fmt;
use std::sync::Arc;

use mosaic_sdk::types::RuntimeMode;
use mosaic_sdk::{ModuleRuntime, Plugin, PluginError};
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, info};

pub use handler::{Method, MockResponse, RequestHandler};

/// Mock plugin errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MockError {
    /// Handlers arrived after the mock server started.
    #[error(
        "cannot register {count} request handler(s): the mock server already started. Register handlers from a module's register function"
    )]
    AlreadyStarted { count: usize },

    /// The runtime has no mock plugin attached.
    #[error(transparent)]
    NotAttached(#[from] PluginError),
}

type StartedListener = Arc<dyn Fn() + Send + Sync>;

/// Mock server state: collected handlers and whether the server started.
#[derive(Default)]
pub struct MockServerState {
    handlers: Vec<RequestHandler>,
    started: bool,
    listeners: Vec<StartedListener>,
}

impl fmt::Debug for MockServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockServerState")
            .field("handlers", &self.handlers.len())
            .field("started", &self.started)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

/// Plugin collecting mocked request handlers from modules.
#[derive(Debug, Default)]
pub struct MockPlugin {
    state: Mutex<MockServerState>,
}

impl MockPlugin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add handlers. Fails once the server started.
    pub fn register_request_handlers(
        &self,
        handlers: impl IntoIterator<Item = RequestHandler>,
    ) -> Result<(), MockError> {
        let handlers: Vec<RequestHandler> = handlers.into_iter().collect();
        let mut state = self.state.lock();
        if state.started {
            return Err(MockError::AlreadyStarted {
                count: handlers.len(),
            });
        }
        debug!(count = handlers.len(), "request handlers registered");
        state.handlers.extend(handlers);
        Ok(())
    }

    /// Handlers in registration order.
    pub fn request_handlers(&self) -> Vec<RequestHandler> {
        self.state.lock().handlers.clone()
    }

    /// Answer a request with the first matching handler.
    pub fn handle(&self, method: Method, path: &str) -> Option<MockResponse> {
        self.state
            .lock()
            .handlers
            .iter()
            .find(|handler| handler.matches(method, path).is_some())
            .map(|handler| handler.response.clone())
    }

    /// Record that the mock server started. Returns `false` if it already was.
    pub fn mark_started(&self) -> bool {
        let mut state = self.state.lock();
        if state.started {
            return false;
        }
        state.started = true;
        let listeners = state.listeners.clone();
        let count = state.handlers.len();
        drop(state);

        info!(handlers = count, "mock server started");
        for listener in listeners {
            listener();
        }
        true
    }

    pub fn is_started(&self) -> bool {
        self.state.lock().started
    }

    /// Call `listener` when the server starts.
    pub fn subscribe_started(&self, listener: impl Fn() + Send + Sync + 'static) {
        self.state.lock().listeners.push(Arc::new(listener));
    }

    /// Forget handlers, listeners and the started flag.
    pub fn reset_for_testing(&self) {
        *self.state.lock() = MockServerState::default();
    }
}

impl Plugin for MockPlugin {
    fn name(&self) -> &'static str {
        "mosaic-mock"
    }

    fn is_ready(&self) -> bool {
        self.is_started()
    }
}

/// Register handlers from module code.
///
/// Handlers are only collected in development mode; in production the call
/// is a no-op.
pub fn register_request_handlers(
    runtime: &dyn ModuleRuntime,
    handlers: impl IntoIterator<Item = RequestHandler>,
) -> Result<(), MockError> {
    if runtime.mode() != RuntimeMode::Development {
        debug!(module = %runtime.module_id(), "skipping request handlers outside development mode");
        return Ok(());
    }
    runtime.get_plugin::<MockPlugin>()?.register_request_handlers(handlers)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    use super::*;

    #[test]
    fn handlers_are_rejected_after_start() {
        let plugin = MockPlugin::new();
        plugin
            .register_request_handlers([RequestHandler::get("/api/session", json!({}))])
            .unwrap();
        assert!(!plugin.is_ready());

        assert!(plugin.mark_started());
        assert!(plugin.is_ready());

        let err = plugin
            .register_request_handlers([RequestHandler::get("/api/late", json!({}))])
            .unwrap_err();
        assert_eq!(err, MockError::AlreadyStarted { count: 1 });
        assert_eq!(plugin.request_handlers().len(), 1);
    }

    #[test]
    fn first_matching_handler_answers() {
        let plugin = MockPlugin::new();
        plugin
            .register_request_handlers([
                RequestHandler::get("/api/orders/:id", json!({"id": "any"})),
                RequestHandler::get("/api/orders/1", json!({"id": "one"})),
            ])
            .unwrap();

        let response = plugin.handle(Method::Get, "/api/orders/1").unwrap();
        assert_eq!(response.body["id"], "any");
        assert!(plugin.handle(Method::Post, "/api/orders/1").is_none());
    }

    #[test]
    fn started_listeners_fire_once() {
        let plugin = MockPlugin::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        plugin.subscribe_started(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(plugin.mark_started());
        assert!(!plugin.mark_started());
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn reset_clears_state() {
        let plugin = MockPlugin::new();
        plugin
            .register_request_handlers([RequestHandler::get("/a", json!(null))])
            .unwrap();
        plugin.mark_started();

        plugin.reset_for_testing();
        assert!(!plugin.is_started());
        assert!(plugin.request_handlers().is_empty());
        plugin
            .register_request_handlers([RequestHandler::get("/b", json!(null))])
            .unwrap();
    }

    #[test]
    fn instances_do_not_share_state() {
        let first = MockPlugin::new();
        let second = MockPlugin::new();
        first.mark_started();
        assert!(!second.is_started());
    }
}
