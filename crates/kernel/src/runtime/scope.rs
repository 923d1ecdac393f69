//! The module-facing runtime handle.

use std::sync::Arc;

use mosaic_sdk::types::{
    ModuleId, NavigationItem, NavigationOptions, RouteDefinition, RouteOptions, RuntimeMode,
};
use mosaic_sdk::{DeferredRegistration, ModuleRuntime, PluginRegistry, RegistrationError};
use serde_json::Value;

use super::Runtime;
use crate::registration::{RegistrationOrigin, RegistrationPhase};

/// A [`Runtime`] scoped to one module and one registration pass.
///
/// Everything registered through the scope is attributed to its module. Scopes
/// are created by the bootstrap functions and live for one call into module
/// code.
#[derive(Debug, Clone)]
pub struct ModuleScope {
    runtime: Runtime,
    origin: RegistrationOrigin,
}

impl ModuleScope {
    pub(crate) fn new(runtime: Runtime, origin: RegistrationOrigin) -> Self {
        Self { runtime, origin }
    }

    pub fn phase(&self) -> RegistrationPhase {
        self.origin.phase
    }
}

impl ModuleRuntime for ModuleScope {
    fn module_id(&self) -> &ModuleId {
        &self.origin.module
    }

    fn register_route(
        &self,
        route: RouteDefinition,
        options: RouteOptions,
    ) -> Result<(), RegistrationError> {
        self.runtime.add_route(route, options, self.origin.clone())
    }

    fn register_navigation_item(
        &self,
        item: NavigationItem,
        options: NavigationOptions,
    ) -> Result<(), RegistrationError> {
        self.runtime
            .add_navigation_item(item, options, self.origin.clone());
        Ok(())
    }

    fn register_deferred_registration(
        &self,
        callback: Arc<dyn DeferredRegistration>,
    ) -> Result<(), RegistrationError> {
        if self.origin.phase == RegistrationPhase::Deferred {
            return Err(RegistrationError::DeferredOutsideRegistration {
                module: self.origin.module.to_string(),
            });
        }
        self.runtime
            .set_deferred_callback(&self.origin.module, callback)
    }

    fn plugins(&self) -> &PluginRegistry {
        self.runtime.plugins()
    }

    fn mode(&self) -> RuntimeMode {
        self.runtime.mode()
    }

    fn session(&self) -> Option<Value> {
        self.runtime.session()
    }
}
