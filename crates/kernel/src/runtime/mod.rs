//! Runtime aggregator.
//!
//! The [`Runtime`] owns the registration tracker, the route and navigation
//! registries and the deferred coordinator. Modules reach it through a
//! [`ModuleScope`]; the rendering layer queries the aggregated routes and
//! menus and observes [`RuntimeState`] through a `watch` channel.
//!
//! The lock around the registries is never held while module code or a
//! listener runs, so a module may register from inside another module's
//! registration.

mod options;
mod scope;

use std::fmt;
use std::sync::Arc;

use mosaic_sdk::types::{
    ModuleClass, ModuleId, NavigationItem, NavigationOptions, RouteDefinition, RouteOptions,
    RuntimeMode,
};
use mosaic_sdk::{
    DeferredRegistration, Plugin, PluginError, PluginRegistry, RegistrationError, SessionAccessor,
};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::deferred::{DeferredCoordinator, DeferredError, DeferredInvocation, DeferredStatus};
use crate::error::ValidationError;
use crate::navigation::NavigationRegistry;
use crate::registration::{
    BootstrapError, ModuleRegistrationError, RegistrationOrigin, RegistrationPhase,
    RegistrationStatus, RegistrationTracker, StatusChange, SubscriptionId,
};
use crate::route::RouteRegistry;

pub use options::{RuntimeOptions, RuntimeOptionsBuilder};
pub use scope::ModuleScope;

/// Lifecycle of the runtime as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum RuntimeState {
    /// No module batch started yet.
    #[default]
    Bootstrapping,
    ModulesRegistering,
    /// Every module settled; deferred callbacks wait for data.
    ModulesReady,
    DeferredRegistering,
    /// Modules and deferred callbacks all settled.
    Ready,
}

impl fmt::Display for RuntimeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Bootstrapping => "bootstrapping",
            Self::ModulesRegistering => "modules-registering",
            Self::ModulesReady => "modules-ready",
            Self::DeferredRegistering => "deferred-registering",
            Self::Ready => "ready",
        };
        f.write_str(label)
    }
}

#[derive(Default)]
struct Core {
    tracker: RegistrationTracker,
    routes: RouteRegistry,
    navigation: NavigationRegistry,
    deferred: DeferredCoordinator,
}

impl Core {
    fn state(&self) -> RuntimeState {
        let started = [ModuleClass::Local, ModuleClass::Remote]
            .into_iter()
            .any(|class| self.tracker.status(class) != RegistrationStatus::Idle);

        if !started {
            RuntimeState::Bootstrapping
        } else if !self.tracker.is_ready() {
            RuntimeState::ModulesRegistering
        } else if self.deferred.is_running() {
            RuntimeState::DeferredRegistering
        } else if self.deferred.is_complete() {
            RuntimeState::Ready
        } else {
            RuntimeState::ModulesReady
        }
    }
}

struct Inner {
    core: Mutex<Core>,
    state: watch::Sender<RuntimeState>,
    plugins: PluginRegistry,
    session_accessor: Option<Arc<dyn SessionAccessor>>,
    mode: RuntimeMode,
}

/// Shared handle to the registration runtime. Cloning is cheap.
#[derive(Clone)]
pub struct Runtime {
    inner: Arc<Inner>,
}

impl Runtime {
    pub fn new(options: RuntimeOptions) -> Self {
        let (state, _) = watch::channel(RuntimeState::Bootstrapping);
        debug!(
            mode = ?options.mode,
            plugins = ?options.plugins.names(),
            "runtime created"
        );
        Self {
            inner: Arc::new(Inner {
                core: Mutex::new(Core::default()),
                state,
                plugins: options.plugins,
                session_accessor: options.session_accessor,
                mode: options.mode,
            }),
        }
    }

    pub fn mode(&self) -> RuntimeMode {
        self.inner.mode
    }

    pub fn plugins(&self) -> &PluginRegistry {
        &self.inner.plugins
    }

    /// Typed plugin lookup.
    pub fn get_plugin<P: Plugin>(&self) -> Result<Arc<P>, PluginError> {
        self.inner.plugins.get::<P>()
    }

    /// Whether every attached plugin reports ready.
    pub fn plugins_ready(&self) -> bool {
        self.inner.plugins.all_ready()
    }

    /// Current session, as exposed by the session accessor.
    pub fn session(&self) -> Option<Value> {
        self.inner
            .session_accessor
            .as_ref()
            .and_then(|accessor| accessor.session())
    }

    /// The merged route tree.
    pub fn routes(&self) -> Vec<RouteDefinition> {
        self.inner.core.lock().routes.routes()
    }

    /// Sorted items of a menu.
    pub fn navigation_items(&self, menu_id: &str) -> Vec<NavigationItem> {
        self.inner.core.lock().navigation.items(menu_id)
    }

    pub fn menu_ids(&self) -> Vec<String> {
        self.inner
            .core
            .lock()
            .navigation
            .menu_ids()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    pub fn state(&self) -> RuntimeState {
        *self.inner.state.borrow()
    }

    /// Receiver for runtime state transitions.
    pub fn watch_state(&self) -> watch::Receiver<RuntimeState> {
        self.inner.state.subscribe()
    }

    /// Wait until the runtime reaches `target` or a later state.
    pub async fn wait_for(&self, target: RuntimeState) -> RuntimeState {
        let mut receiver = self.watch_state();
        match receiver.wait_for(|state| *state >= target).await {
            Ok(state) => *state,
            // The sender lives in `self`, so the channel cannot close here.
            Err(_) => self.state(),
        }
    }

    /// Wait until every module settled.
    pub async fn ready(&self) -> RuntimeState {
        self.wait_for(RuntimeState::ModulesReady).await
    }

    /// Status of a module class.
    pub fn status(&self, class: ModuleClass) -> RegistrationStatus {
        self.inner.core.lock().tracker.status(class)
    }

    pub fn module_status(&self, module: &ModuleId) -> RegistrationStatus {
        self.inner.core.lock().tracker.module_status(module)
    }

    /// Whether both module classes settled.
    pub fn is_ready(&self) -> bool {
        self.inner.core.lock().tracker.is_ready()
    }

    /// Call `listener` on every module class status transition.
    pub fn subscribe(
        &self,
        listener: impl Fn(&StatusChange) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.inner.core.lock().tracker.subscribe(Arc::new(listener))
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.core.lock().tracker.unsubscribe(id)
    }

    /// Module registration failures, local modules first.
    pub fn registration_errors(&self) -> Vec<ModuleRegistrationError> {
        let core = self.inner.core.lock();
        core.tracker
            .errors(ModuleClass::Local)
            .iter()
            .chain(core.tracker.errors(ModuleClass::Remote))
            .cloned()
            .collect()
    }

    /// Deferred callback failures, in completion order.
    pub fn deferred_errors(&self) -> Vec<ModuleRegistrationError> {
        self.inner.core.lock().deferred.errors().to_vec()
    }

    pub fn deferred_status(&self, module: &ModuleId) -> Option<DeferredStatus> {
        self.inner.core.lock().deferred.status(module)
    }

    /// Whether every module's deferred registration reached a terminal state.
    pub fn is_deferred_registration_complete(&self) -> bool {
        self.inner.core.lock().deferred.is_complete()
    }

    /// Cross-module validation of routes and navigation.
    ///
    /// Meant to run once modules are ready; earlier calls are refused since
    /// pending references may still resolve.
    pub fn validate_registrations(&self) -> Result<(), ValidationError> {
        let core = self.inner.core.lock();
        if !core.tracker.is_ready() {
            return Err(ValidationError::NotReady {
                local: core.tracker.status(ModuleClass::Local),
                remote: core.tracker.status(ModuleClass::Remote),
            });
        }

        let routes = core.routes.validate();
        let navigation = core.navigation.validate();
        drop(core);

        if routes.is_empty() && navigation.is_empty() {
            debug!("registrations validated");
            return Ok(());
        }
        for err in &routes {
            error!(error = %err, "invalid route registration");
        }
        for err in &navigation {
            error!(error = %err, "invalid navigation registration");
        }
        Err(ValidationError::Invalid { routes, navigation })
    }

    pub(crate) fn scope(&self, module: ModuleId, phase: RegistrationPhase) -> ModuleScope {
        ModuleScope::new(
            self.clone(),
            RegistrationOrigin {
                module,
                phase,
            },
        )
    }

    /// Announce a batch of modules. `names` holds one entry per module.
    pub(crate) fn start_batch(
        &self,
        class: ModuleClass,
        names: &[Option<String>],
    ) -> Result<Vec<ModuleId>, BootstrapError> {
        let mut core = self.inner.core.lock();
        let batch = core.tracker.start_registration(class, names.len())?;
        let modules = batch.module_ids(names.iter().map(Option::as_deref));
        for module in &modules {
            core.deferred.open(module);
        }
        let listeners = core.tracker.listeners();
        self.publish(&core);
        drop(core);

        info!(%class, modules = modules.len(), "module registration started");
        notify(&listeners, &batch.change);
        Ok(modules)
    }

    pub(crate) fn begin_module(&self, module: &ModuleId) {
        self.inner.core.lock().tracker.begin_module(module);
    }

    /// Record a module's initial registration outcome.
    pub(crate) fn finish_module(
        &self,
        module: &ModuleId,
        outcome: Result<(), ModuleRegistrationError>,
    ) {
        let mut core = self.inner.core.lock();
        core.deferred.enroll(module, outcome.is_ok());
        let change = core.tracker.complete_registration(module, outcome);
        let listeners = core.tracker.listeners();
        self.publish(&core);
        drop(core);

        if let Some(change) = change {
            info!(class = %change.class, "module class ready");
            notify(&listeners, &change);
        }
    }

    pub(crate) fn provide_deferred_data(&self, data: Value) -> Result<(), DeferredError> {
        self.inner.core.lock().deferred.provide_data(data)
    }

    /// Hand out pending deferred callbacks once modules are ready and data is
    /// available.
    pub(crate) fn take_deferred_invocations(&self) -> Option<(Value, Vec<DeferredInvocation>)> {
        let mut core = self.inner.core.lock();
        if !core.tracker.is_ready() {
            return None;
        }
        let taken = core.deferred.take_invocations();
        self.publish(&core);
        taken
    }

    /// Hand out every settled callback again with new data, after dropping
    /// what those modules registered in their previous deferred pass.
    pub(crate) fn update_deferred_invocations(
        &self,
        data: Value,
    ) -> Result<Vec<DeferredInvocation>, DeferredError> {
        let mut core = self.inner.core.lock();
        let invocations = core.deferred.update_invocations(data)?;

        let refreshed: Vec<&ModuleId> = invocations.iter().map(|i| &i.module).collect();
        let owned = |origin: &RegistrationOrigin| {
            origin.phase == RegistrationPhase::Deferred && refreshed.contains(&&origin.module)
        };
        let routes = core.routes.remove_where(owned);
        let items = core.navigation.remove_where(owned);
        debug!(
            modules = invocations.len(),
            routes, items, "deferred registrations reset for update"
        );

        self.publish(&core);
        Ok(invocations)
    }

    pub(crate) fn finish_deferred(
        &self,
        module: &ModuleId,
        outcome: Result<(), ModuleRegistrationError>,
    ) {
        let mut core = self.inner.core.lock();
        core.deferred.complete(module, outcome);
        self.publish(&core);
    }

    fn add_route(
        &self,
        route: RouteDefinition,
        options: RouteOptions,
        origin: RegistrationOrigin,
    ) -> Result<(), RegistrationError> {
        let module = origin.module.clone();
        let mut core = self.inner.core.lock();
        match core.routes.add_route(route, options, origin) {
            Ok(_) => Ok(()),
            Err(err) => {
                drop(core);
                warn!(%module, error = %err, "route registration rejected");
                Err(err)
            }
        }
    }

    fn add_navigation_item(
        &self,
        item: NavigationItem,
        options: NavigationOptions,
        origin: RegistrationOrigin,
    ) {
        self.inner
            .core
            .lock()
            .navigation
            .add_item(item, options, origin);
    }

    fn set_deferred_callback(
        &self,
        module: &ModuleId,
        callback: Arc<dyn DeferredRegistration>,
    ) -> Result<(), RegistrationError> {
        self.inner
            .core
            .lock()
            .deferred
            .set_callback(module, callback)
    }

    /// Push the state derived from `core` to watchers. Called with the lock
    /// held so transitions are published in order.
    fn publish(&self, core: &Core) {
        let next = core.state();
        self.inner.state.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            info!(from = %current, to = %next, "runtime state changed");
            *current = next;
            true
        });
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("mode", &self.inner.mode)
            .field("state", &self.state())
            .field("plugins", &self.inner.plugins.names())
            .finish_non_exhaustive()
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new(RuntimeOptions::default())
    }
}

fn notify(listeners: &[crate::registration::StatusListener], change: &StatusChange) {
    for listener in listeners {
        listener(change);
    }
}
