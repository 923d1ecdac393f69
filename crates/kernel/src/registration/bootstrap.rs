//! Bootstrap entry points.
//!
//! The host calls these to run modules' register functions against a
//! [`Runtime`]. Modules of a batch run concurrently on the caller's task; each
//! one's failure (error, panic, load failure) is logged and recorded without
//! affecting its siblings.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::join_all;
use mosaic_sdk::types::{DeferredOperation, ModuleClass, ModuleId};
use mosaic_sdk::{ModuleRuntime, RegisterModule};
use serde_json::Value;
use tracing::{debug, error, info};

use super::error::{BootstrapError, ModuleRegistrationError, panic_message};
use super::manifest::RemoteDefinition;
use super::RegistrationPhase;
use crate::deferred::{DeferredError, DeferredInvocation};
use crate::runtime::Runtime;

/// Fetches a remote module's entry point.
///
/// Module federation and URL resolution live with the host; the kernel only
/// needs the loaded [`RegisterModule`].
#[async_trait]
pub trait RemoteModuleLoader: Send + Sync {
    async fn load(&self, remote: &RemoteDefinition) -> anyhow::Result<Arc<dyn RegisterModule>>;
}

/// Register local modules, in bootstrap order.
///
/// Resolves once every module settled and returns the failures recorded for
/// this batch. When global data was supplied early and this batch readies the
/// runtime, the deferred callbacks run here and their failures are returned
/// too. Fails only when a local batch is already registering.
pub async fn register_local_modules(
    runtime: &Runtime,
    modules: Vec<Arc<dyn RegisterModule>>,
    context: &Value,
) -> Result<Vec<ModuleRegistrationError>, BootstrapError> {
    let ids = runtime.start_batch(ModuleClass::Local, &vec![None; modules.len()])?;

    let registrations = ids.into_iter().zip(modules).map(|(module, entry)| async move {
        runtime.begin_module(&module);
        let outcome = run_register(runtime, &module, entry.as_ref(), context).await;
        settle(runtime, &module, outcome)
    });
    let mut errors = collect_errors(join_all(registrations).await);

    errors.extend(run_pending_deferred(runtime).await);
    Ok(errors)
}

/// Load and register remote modules.
///
/// A remote that fails to load is recorded as failed; the others proceed.
/// Returns the same failures as [`register_local_modules`], deferred
/// failures included.
pub async fn register_remote_modules(
    runtime: &Runtime,
    remotes: &[RemoteDefinition],
    loader: &dyn RemoteModuleLoader,
    context: &Value,
) -> Result<Vec<ModuleRegistrationError>, BootstrapError> {
    let names: Vec<Option<String>> = remotes
        .iter()
        .map(|remote| Some(remote.name.clone()))
        .collect();
    let ids = runtime.start_batch(ModuleClass::Remote, &names)?;

    let registrations = ids.into_iter().zip(remotes).map(|(module, remote)| async move {
        runtime.begin_module(&module);
        let loaded = AssertUnwindSafe(loader.load(remote)).catch_unwind().await;
        let outcome = match loaded {
            Ok(Ok(entry)) => {
                debug!(%module, url = ?remote.url, "remote module loaded");
                run_register(runtime, &module, entry.as_ref(), context).await
            }
            Ok(Err(err)) => Err(ModuleRegistrationError::LoadFailed {
                module: module.clone(),
                message: format!("{err:#}"),
            }),
            Err(payload) => Err(ModuleRegistrationError::LoadFailed {
                module: module.clone(),
                message: format!("loader panicked: {}", panic_message(payload.as_ref())),
            }),
        };
        settle(runtime, &module, outcome)
    });
    let mut errors = collect_errors(join_all(registrations).await);

    errors.extend(run_pending_deferred(runtime).await);
    Ok(errors)
}

/// Supply the global data deferred callbacks wait for.
///
/// Callbacks run right away when every module is ready; otherwise the data is
/// kept and they run as soon as the last module class settles. Returns the
/// deferred failures of the callbacks run by this call.
pub async fn register_deferred_registrations(
    runtime: &Runtime,
    data: Value,
) -> Result<Vec<ModuleRegistrationError>, DeferredError> {
    runtime.provide_deferred_data(data)?;
    Ok(run_pending_deferred(runtime).await)
}

/// Re-run every settled deferred callback with new data.
///
/// Routes and navigation items a module added from its previous deferred
/// pass are dropped first, so the callback registers them afresh.
pub async fn update_deferred_registrations(
    runtime: &Runtime,
    data: Value,
) -> Result<Vec<ModuleRegistrationError>, DeferredError> {
    let invocations = runtime.update_deferred_invocations(data.clone())?;
    info!(modules = invocations.len(), "updating deferred registrations");
    Ok(run_deferred(runtime, &data, invocations, DeferredOperation::Update).await)
}

async fn run_register(
    runtime: &Runtime,
    module: &ModuleId,
    entry: &dyn RegisterModule,
    context: &Value,
) -> Result<(), ModuleRegistrationError> {
    let scope = runtime.scope(module.clone(), RegistrationPhase::Initial);
    let handle: &dyn ModuleRuntime = &scope;
    match AssertUnwindSafe(entry.register(handle, context))
        .catch_unwind()
        .await
    {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(ModuleRegistrationError::register_failed(module.clone(), &err)),
        Err(payload) => Err(ModuleRegistrationError::panicked(
            module.clone(),
            payload.as_ref(),
        )),
    }
}

fn settle(
    runtime: &Runtime,
    module: &ModuleId,
    outcome: Result<(), ModuleRegistrationError>,
) -> Option<ModuleRegistrationError> {
    match &outcome {
        Ok(()) => debug!(%module, "module registered"),
        Err(err) => error!(%module, error = %err, "module registration failed"),
    }
    let failure = outcome.as_ref().err().cloned();
    runtime.finish_module(module, outcome);
    failure
}

fn collect_errors(
    outcomes: Vec<Option<ModuleRegistrationError>>,
) -> Vec<ModuleRegistrationError> {
    outcomes.into_iter().flatten().collect()
}

async fn run_pending_deferred(runtime: &Runtime) -> Vec<ModuleRegistrationError> {
    match runtime.take_deferred_invocations() {
        Some((data, invocations)) => {
            if !invocations.is_empty() {
                info!(modules = invocations.len(), "running deferred registrations");
            }
            run_deferred(runtime, &data, invocations, DeferredOperation::Register).await
        }
        None => {
            debug!("deferred registrations waiting for modules or data");
            Vec::new()
        }
    }
}

async fn run_deferred(
    runtime: &Runtime,
    data: &Value,
    invocations: Vec<DeferredInvocation>,
    operation: DeferredOperation,
) -> Vec<ModuleRegistrationError> {
    let runs = invocations.into_iter().map(|invocation| async move {
        let module = invocation.module;
        let scope = runtime.scope(module.clone(), RegistrationPhase::Deferred);
        let handle: &dyn ModuleRuntime = &scope;
        let result = AssertUnwindSafe(invocation.callback.register(handle, data, operation))
            .catch_unwind()
            .await;

        let outcome = match result {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(ModuleRegistrationError::DeferredFailed {
                module: module.clone(),
                message: format!("{err:#}"),
            }),
            Err(payload) => Err(ModuleRegistrationError::DeferredFailed {
                module: module.clone(),
                message: format!("panicked: {}", panic_message(payload.as_ref())),
            }),
        };
        match &outcome {
            Ok(()) => debug!(%module, ?operation, "deferred registration done"),
            Err(err) => error!(%module, error = %err, "deferred registration failed"),
        }

        let failure = outcome.as_ref().err().cloned();
        runtime.finish_deferred(&module, outcome);
        failure
    });
    collect_errors(join_all(runs).await)
}
