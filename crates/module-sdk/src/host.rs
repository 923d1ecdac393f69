//! The surface a module sees while it registers.
//!
//! A module's `register` function receives a [`ModuleRuntime`] handle scoped to
//! that module. Everything registered through the handle is attributed to the
//! module, which is how the kernel orders routes deterministically and knows
//! whose deferred callback to call later.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::RegistrationError;
use crate::logger::ModuleLogger;
use crate::plugin::{Plugin, PluginError, PluginRegistry};
use crate::types::{
    DeferredOperation, ModuleId, NavigationItem, NavigationOptions, RouteDefinition, RouteOptions,
    RuntimeMode,
};

/// Handle passed to a module's register and deferred functions.
pub trait ModuleRuntime: Send + Sync {
    /// The module this handle registers for.
    fn module_id(&self) -> &ModuleId;

    fn register_route(
        &self,
        route: RouteDefinition,
        options: RouteOptions,
    ) -> Result<(), RegistrationError>;

    fn register_navigation_item(
        &self,
        item: NavigationItem,
        options: NavigationOptions,
    ) -> Result<(), RegistrationError>;

    /// Enlist a callback to run once global data is available.
    ///
    /// Only valid from the module's initial registration, once per module.
    fn register_deferred_registration(
        &self,
        callback: Arc<dyn DeferredRegistration>,
    ) -> Result<(), RegistrationError>;

    fn plugins(&self) -> &PluginRegistry;

    fn mode(&self) -> RuntimeMode;

    /// Current session as exposed by the host's session accessor.
    fn session(&self) -> Option<Value>;

    fn logger(&self) -> ModuleLogger {
        ModuleLogger::new(self.module_id().clone())
    }
}

impl dyn ModuleRuntime + '_ {
    /// Typed plugin lookup.
    pub fn get_plugin<P: Plugin>(&self) -> Result<Arc<P>, PluginError> {
        self.plugins().get::<P>()
    }

    /// Register a route with default options.
    pub fn route(&self, route: RouteDefinition) -> Result<(), RegistrationError> {
        self.register_route(route, RouteOptions::default())
    }

    /// Register a navigation item in the root menu.
    pub fn navigation_item(&self, item: NavigationItem) -> Result<(), RegistrationError> {
        self.register_navigation_item(item, NavigationOptions::default())
    }

    /// Enlist a closure as the module's deferred callback.
    pub fn defer<F>(&self, callback: F) -> Result<(), RegistrationError>
    where
        F: Fn(&dyn ModuleRuntime, &Value, DeferredOperation) -> anyhow::Result<()>
            + Send
            + Sync
            + 'static,
    {
        self.register_deferred_registration(Arc::new(callback))
    }
}

/// A module's entry point.
#[async_trait]
pub trait RegisterModule: Send + Sync {
    async fn register(&self, runtime: &dyn ModuleRuntime, context: &Value) -> anyhow::Result<()>;
}

#[async_trait]
impl<F> RegisterModule for F
where
    F: Fn(&dyn ModuleRuntime, &Value) -> anyhow::Result<()> + Send + Sync,
{
    async fn register(&self, runtime: &dyn ModuleRuntime, context: &Value) -> anyhow::Result<()> {
        self(runtime, context)
    }
}

/// Second-phase registration, run once global data is available.
#[async_trait]
pub trait DeferredRegistration: Send + Sync {
    async fn register(
        &self,
        runtime: &dyn ModuleRuntime,
        data: &Value,
        operation: DeferredOperation,
    ) -> anyhow::Result<()>;
}

#[async_trait]
impl<F> DeferredRegistration for F
where
    F: Fn(&dyn ModuleRuntime, &Value, DeferredOperation) -> anyhow::Result<()> + Send + Sync,
{
    async fn register(
        &self,
        runtime: &dyn ModuleRuntime,
        data: &Value,
        operation: DeferredOperation,
    ) -> anyhow::Result<()> {
        self(runtime, data, operation)
    }
}

/// Gives modules read access to the host's session.
pub trait SessionAccessor: Send + Sync {
    fn session(&self) -> Option<Value>;
}

impl<F> SessionAccessor for F
where
    F: Fn() -> Option<Value> + Send + Sync,
{
    fn session(&self) -> Option<Value> {
        self()
    }
}
