//! Deferred registration coordinator.
//!
//! Modules may enlist a second-phase callback that needs global data (session,
//! feature flags). The coordinator keeps one slot per module and hands out the
//! callbacks exactly once, when the runtime reports that modules are ready and
//! the data has been supplied, in whichever order those two happen.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use mosaic_sdk::types::ModuleId;
use mosaic_sdk::{DeferredRegistration, RegistrationError};
use serde_json::Value;
use tracing::{debug, warn};

use super::DeferredError;
use crate::registration::ModuleRegistrationError;

/// Per-module state of the deferred pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DeferredStatus {
    /// Waiting for data and module readiness.
    #[default]
    Pending,
    /// Callback handed out, not settled yet.
    Invoked,
    /// Settled successfully, or nothing to do.
    Done,
    Failed,
}

impl DeferredStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

/// A callback to run, with the module it belongs to.
#[derive(Clone)]
pub struct DeferredInvocation {
    pub module: ModuleId,
    pub callback: Arc<dyn DeferredRegistration>,
}

impl fmt::Debug for DeferredInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredInvocation")
            .field("module", &self.module)
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
struct Slot {
    callback: Option<Arc<dyn DeferredRegistration>>,
    status: DeferredStatus,
    /// The module's initial registration has settled.
    enrolled: bool,
}

/// Tracks deferred callbacks and their state per module.
#[derive(Default)]
pub struct DeferredCoordinator {
    slots: BTreeMap<ModuleId, Slot>,
    data: Option<Value>,
    triggered: bool,
    errors: Vec<ModuleRegistrationError>,
}

impl DeferredCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a slot for a module that is about to register.
    pub fn open(&mut self, module: &ModuleId) {
        self.slots.entry(module.clone()).or_default();
    }

    /// Store the callback a module enlisted during its registration.
    pub fn set_callback(
        &mut self,
        module: &ModuleId,
        callback: Arc<dyn DeferredRegistration>,
    ) -> Result<(), RegistrationError> {
        let slot = self.slots.entry(module.clone()).or_default();
        if slot.enrolled {
            return Err(RegistrationError::DeferredOutsideRegistration {
                module: module.to_string(),
            });
        }
        if slot.callback.is_some() {
            return Err(RegistrationError::DeferredAlreadyRegistered {
                module: module.to_string(),
            });
        }
        slot.callback = Some(callback);
        debug!(%module, "deferred registration enlisted");
        Ok(())
    }

    /// Close a module's slot once its initial registration settled.
    ///
    /// A module without a callback, or whose registration failed, has nothing
    /// left to do.
    pub fn enroll(&mut self, module: &ModuleId, registered: bool) {
        let slot = self.slots.entry(module.clone()).or_default();
        slot.enrolled = true;
        if !registered && slot.callback.take().is_some() {
            debug!(%module, "dropping deferred registration of failed module");
        }
        // Modules enrolled after the deferred pass ran stay pending and are
        // picked up by the next trigger.
        if slot.callback.is_none() {
            slot.status = DeferredStatus::Done;
        }
    }

    /// Supply the global data. Only once; later changes go through
    /// [`update_invocations`](Self::update_invocations).
    pub fn provide_data(&mut self, data: Value) -> Result<(), DeferredError> {
        if self.data.is_some() {
            return Err(DeferredError::AlreadyRegistered);
        }
        self.data = Some(data);
        Ok(())
    }

    pub fn has_data(&self) -> bool {
        self.data.is_some()
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered
    }

    /// Hand out every pending callback, if data is available.
    ///
    /// The caller guarantees modules are ready. Each callback is handed out
    /// once; modules enrolled after the first trigger are picked up by the
    /// next call.
    pub fn take_invocations(&mut self) -> Option<(Value, Vec<DeferredInvocation>)> {
        let data = self.data.clone()?;
        self.triggered = true;

        let invocations: Vec<_> = self
            .slots
            .iter_mut()
            .filter(|(_, slot)| slot.enrolled && slot.status == DeferredStatus::Pending)
            .filter_map(|(module, slot)| {
                let callback = slot.callback.clone()?;
                slot.status = DeferredStatus::Invoked;
                Some(DeferredInvocation {
                    module: module.clone(),
                    callback,
                })
            })
            .collect();

        Some((data, invocations))
    }

    /// Callbacks to re-run with new data, for modules whose deferred
    /// registration settled.
    pub fn update_invocations(
        &mut self,
        data: Value,
    ) -> Result<Vec<DeferredInvocation>, DeferredError> {
        if !self.triggered {
            return Err(DeferredError::NotRegistered);
        }
        if let Some((module, _)) = self
            .slots
            .iter()
            .find(|(_, slot)| slot.status == DeferredStatus::Invoked)
        {
            return Err(DeferredError::StillRunning {
                module: module.to_string(),
            });
        }
        self.data = Some(data);

        Ok(self
            .slots
            .iter_mut()
            .filter(|(_, slot)| slot.status.is_terminal())
            .filter_map(|(module, slot)| {
                let callback = slot.callback.clone()?;
                slot.status = DeferredStatus::Invoked;
                Some(DeferredInvocation {
                    module: module.clone(),
                    callback,
                })
            })
            .collect())
    }

    /// Record a callback's outcome.
    pub fn complete(&mut self, module: &ModuleId, outcome: Result<(), ModuleRegistrationError>) {
        let Some(slot) = self.slots.get_mut(module) else {
            warn!(%module, "deferred completion for unknown module, ignoring");
            return;
        };
        if slot.status != DeferredStatus::Invoked {
            warn!(%module, status = ?slot.status, "deferred completion out of order, ignoring");
            return;
        }
        match outcome {
            Ok(()) => slot.status = DeferredStatus::Done,
            Err(err) => {
                slot.status = DeferredStatus::Failed;
                self.errors.push(err);
            }
        }
    }

    pub fn status(&self, module: &ModuleId) -> Option<DeferredStatus> {
        self.slots.get(module).map(|slot| slot.status)
    }

    /// Whether any enrolled module still waits for its first invocation.
    pub fn has_pending(&self) -> bool {
        self.slots
            .values()
            .any(|slot| slot.enrolled && slot.status == DeferredStatus::Pending)
    }

    /// Whether a handed-out callback has not settled yet.
    pub fn is_running(&self) -> bool {
        self.slots
            .values()
            .any(|slot| slot.status == DeferredStatus::Invoked)
    }

    /// Whether any module enlisted a callback.
    pub fn has_callbacks(&self) -> bool {
        self.slots.values().any(|slot| slot.callback.is_some())
    }

    /// All modules reached a terminal state.
    pub fn is_complete(&self) -> bool {
        self.slots.values().all(|slot| slot.status.is_terminal())
    }

    pub fn errors(&self) -> &[ModuleRegistrationError] {
        &self.errors
    }
}

impl fmt::Debug for DeferredCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let statuses: BTreeMap<String, DeferredStatus> = self
            .slots
            .iter()
            .map(|(module, slot)| (module.to_string(), slot.status))
            .collect();
        f.debug_struct("DeferredCoordinator")
            .field("slots", &statuses)
            .field("has_data", &self.data.is_some())
            .field("triggered", &self.triggered)
            .finish()
    }
}
