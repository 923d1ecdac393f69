//! Mosaic test utilities.
//!
//! Helpers for integration testing: scripted modules, recording deferred
//! callbacks, a static remote loader, and assertion utilities for route trees
//! and navigation menus.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use mosaic_sdk::prelude::*;
use parking_lot::Mutex;
use serde_json::Value;

/// Create a module that registers nothing.
pub fn test_module() -> TestModule {
    TestModule::default()
}

/// A scripted module builder.
///
/// Registrations happen in the order they were added to the builder.
#[derive(Clone, Default)]
pub struct TestModule {
    steps: Vec<Step>,
    deferred: Option<Arc<dyn DeferredRegistration>>,
    failure: Option<Failure>,
    yields: usize,
    calls: Arc<AtomicUsize>,
}

#[derive(Clone)]
enum Step {
    Route(RouteDefinition, RouteOptions),
    Navigation(NavigationItem, NavigationOptions),
}

#[derive(Clone)]
enum Failure {
    Error(String),
    Panic(String),
}

impl TestModule {
    /// Register a route with default options.
    pub fn with_route(self, route: RouteDefinition) -> Self {
        self.with_route_options(route, RouteOptions::default())
    }

    pub fn with_route_options(mut self, route: RouteDefinition, options: RouteOptions) -> Self {
        self.steps.push(Step::Route(route, options));
        self
    }

    /// Register a navigation item in the root menu.
    pub fn with_item(self, item: NavigationItem) -> Self {
        self.with_item_options(item, NavigationOptions::default())
    }

    pub fn with_item_options(mut self, item: NavigationItem, options: NavigationOptions) -> Self {
        self.steps.push(Step::Navigation(item, options));
        self
    }

    /// Enlist a deferred callback.
    pub fn with_deferred(mut self, deferred: Arc<dyn DeferredRegistration>) -> Self {
        self.deferred = Some(deferred);
        self
    }

    /// Return an error after registering everything.
    pub fn failing(mut self, message: &str) -> Self {
        self.failure = Some(Failure::Error(message.to_string()));
        self
    }

    /// Panic after registering everything.
    pub fn panicking(mut self, message: &str) -> Self {
        self.failure = Some(Failure::Panic(message.to_string()));
        self
    }

    /// Yield to the executor this many times before registering, to
    /// interleave with sibling modules.
    pub fn yielding(mut self, times: usize) -> Self {
        self.yields = times;
        self
    }

    /// How many times the register function ran.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn into_module(self) -> Arc<dyn RegisterModule> {
        Arc::new(self)
    }
}

#[async_trait]
impl RegisterModule for TestModule {
    async fn register(&self, runtime: &dyn ModuleRuntime, _context: &Value) -> anyhow::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        for _ in 0..self.yields {
            tokio::task::yield_now().await;
        }

        for step in &self.steps {
            match step.clone() {
                Step::Route(route, options) => runtime.register_route(route, options)?,
                Step::Navigation(item, options) => {
                    runtime.register_navigation_item(item, options)?;
                }
            }
        }
        if let Some(deferred) = &self.deferred {
            runtime.register_deferred_registration(Arc::clone(deferred))?;
        }

        match &self.failure {
            Some(Failure::Error(message)) => anyhow::bail!("{message}"),
            Some(Failure::Panic(message)) => panic!("{message}"),
            None => Ok(()),
        }
    }
}

/// One recorded call of a [`RecordingDeferred`].
#[derive(Debug, Clone, PartialEq)]
pub struct DeferredCall {
    pub module: ModuleId,
    pub data: Value,
    pub operation: DeferredOperation,
}

/// A deferred callback that records its invocations and registers
/// contributions gated on a boolean flag in the data.
#[derive(Clone, Default)]
pub struct RecordingDeferred {
    calls: Arc<Mutex<Vec<DeferredCall>>>,
    gated_routes: Vec<(String, RouteDefinition)>,
    gated_items: Vec<(String, NavigationItem)>,
    failure: Option<String>,
}

impl RecordingDeferred {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `route` when `data[flag]` is `true`.
    pub fn route_if(mut self, flag: &str, route: RouteDefinition) -> Self {
        self.gated_routes.push((flag.to_string(), route));
        self
    }

    /// Register `item` in the root menu when `data[flag]` is `true`.
    pub fn item_if(mut self, flag: &str, item: NavigationItem) -> Self {
        self.gated_items.push((flag.to_string(), item));
        self
    }

    pub fn failing(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    pub fn calls(&self) -> Vec<DeferredCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn into_callback(self) -> Arc<dyn DeferredRegistration> {
        Arc::new(self)
    }
}

#[async_trait]
impl DeferredRegistration for RecordingDeferred {
    async fn register(
        &self,
        runtime: &dyn ModuleRuntime,
        data: &Value,
        operation: DeferredOperation,
    ) -> anyhow::Result<()> {
        self.calls.lock().push(DeferredCall {
            module: runtime.module_id().clone(),
            data: data.clone(),
            operation,
        });

        if let Some(message) = &self.failure {
            anyhow::bail!("{message}");
        }

        let enabled = |flag: &str| data.get(flag).and_then(Value::as_bool).unwrap_or(false);
        for (flag, route) in &self.gated_routes {
            if enabled(flag) {
                runtime.register_route(route.clone(), RouteOptions::default())?;
            }
        }
        for (flag, item) in &self.gated_items {
            if enabled(flag) {
                runtime.register_navigation_item(item.clone(), NavigationOptions::default())?;
            }
        }
        Ok(())
    }
}

/// A remote loader serving modules from memory.
#[derive(Clone, Default)]
pub struct StaticRemoteLoader {
    modules: HashMap<String, Arc<dyn RegisterModule>>,
    loads: Arc<AtomicUsize>,
}

impl StaticRemoteLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_remote(mut self, name: &str, module: Arc<dyn RegisterModule>) -> Self {
        self.modules.insert(name.to_string(), module);
        self
    }

    /// Number of load attempts, including failed ones.
    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    /// Serve a module by name. Unknown names fail like an unreachable remote.
    pub fn get(&self, name: &str) -> anyhow::Result<Arc<dyn RegisterModule>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.modules
            .get(name)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("remote '{name}' is not available"))
    }
}

/// Assertion helpers for route trees and menus.
pub mod assert {
    use mosaic_sdk::types::{NavigationItem, RouteDefinition};

    /// Flatten a route tree into one line per route, children indented by
    /// two spaces per level.
    pub fn outline(routes: &[RouteDefinition]) -> Vec<String> {
        let mut lines = Vec::new();
        walk(routes, 0, &mut lines);
        lines
    }

    fn walk(routes: &[RouteDefinition], depth: usize, lines: &mut Vec<String>) {
        for route in routes {
            lines.push(format!("{}{}", "  ".repeat(depth), route.describe()));
            walk(&route.children, depth + 1, lines);
        }
    }

    /// Labels of a menu level, in order.
    pub fn labels(items: &[NavigationItem]) -> Vec<String> {
        items.iter().map(|item| item.label().to_string()).collect()
    }

    /// Assert that some line of the outline equals `line` once trimmed.
    pub fn has_route(routes: &[RouteDefinition], line: &str) {
        let outline = outline(routes);
        assert!(
            outline.iter().any(|l| l.trim() == line),
            "Expected route '{}' in tree:\n{}",
            line,
            outline.join("\n")
        );
    }

    /// Assert that a string contains a substring.
    pub fn contains(haystack: &str, needle: &str) {
        assert!(
            haystack.contains(needle),
            "Expected string to contain '{}'\nActual: {}",
            needle,
            haystack
        );
    }
}
