//! Registration status tracking per module class.
//!
//! The tracker counts how many modules of each class were announced, how many
//! settled, and derives the class status from those counts. It is a plain
//! synchronous state machine; the runtime owns it behind its lock and calls
//! the listeners it hands out after the lock is released.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use mosaic_sdk::types::{ModuleClass, ModuleId};
use tracing::{debug, warn};

use super::error::{BootstrapError, ModuleRegistrationError};

/// Registration status of a module, or of a whole class.
///
/// `Failed` is only ever reported for a single module: a class whose modules
/// all settled is `Ready`, whatever their individual outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RegistrationStatus {
    #[default]
    Idle,
    InProgress,
    Ready,
    Failed,
}

impl RegistrationStatus {
    /// Whether no further transition is expected.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Ready | Self::Failed)
    }
}

impl fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Idle => "idle",
            Self::InProgress => "in-progress",
            Self::Ready => "ready",
            Self::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// Global readiness: both classes settled.
pub fn is_ready(local: RegistrationStatus, remote: RegistrationStatus) -> bool {
    local == RegistrationStatus::Ready && remote == RegistrationStatus::Ready
}

/// A class status transition, delivered to listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub class: ModuleClass,
    pub previous: RegistrationStatus,
    pub current: RegistrationStatus,
}

/// Callback invoked on every class status transition.
pub type StatusListener = Arc<dyn Fn(&StatusChange) + Send + Sync>;

/// Handle returned by [`RegistrationTracker::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// A batch of modules announced by one bootstrap call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationBatch {
    pub class: ModuleClass,
    /// Index of the batch's first module within its class.
    pub first_index: usize,
    pub len: usize,
    pub change: StatusChange,
}

impl RegistrationBatch {
    /// Ids for the modules of this batch, in bootstrap order.
    pub fn module_ids<'a>(
        &self,
        names: impl IntoIterator<Item = Option<&'a str>>,
    ) -> Vec<ModuleId> {
        names
            .into_iter()
            .take(self.len)
            .enumerate()
            .map(|(offset, name)| ModuleId {
                class: self.class,
                index: self.first_index + offset,
                name: name.map(str::to_string),
            })
            .collect()
    }
}

#[derive(Debug, Default)]
struct ClassState {
    status: RegistrationStatus,
    /// Modules announced in the current batch.
    expected: usize,
    /// Modules of the current batch that settled.
    settled: usize,
    /// Index the next batch starts at.
    next_index: usize,
    modules: BTreeMap<usize, RegistrationStatus>,
    errors: Vec<ModuleRegistrationError>,
}

/// Finite-state record of module registration for both classes.
#[derive(Default)]
pub struct RegistrationTracker {
    local: ClassState,
    remote: ClassState,
    listeners: Vec<(SubscriptionId, StatusListener)>,
    next_subscription: u64,
}

impl RegistrationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn class(&self, class: ModuleClass) -> &ClassState {
        match class {
            ModuleClass::Local => &self.local,
            ModuleClass::Remote => &self.remote,
        }
    }

    fn class_mut(&mut self, class: ModuleClass) -> &mut ClassState {
        match class {
            ModuleClass::Local => &mut self.local,
            ModuleClass::Remote => &mut self.remote,
        }
    }

    /// Status of a module class.
    pub fn status(&self, class: ModuleClass) -> RegistrationStatus {
        self.class(class).status
    }

    /// Status of a single module; `Idle` when unknown.
    pub fn module_status(&self, module: &ModuleId) -> RegistrationStatus {
        self.class(module.class)
            .modules
            .get(&module.index)
            .copied()
            .unwrap_or_default()
    }

    /// Whether both classes settled.
    pub fn is_ready(&self) -> bool {
        is_ready(self.local.status, self.remote.status)
    }

    /// Announce a batch of `module_count` modules for `class`.
    ///
    /// An empty batch settles immediately.
    pub fn start_registration(
        &mut self,
        class: ModuleClass,
        module_count: usize,
    ) -> Result<RegistrationBatch, BootstrapError> {
        let state = self.class_mut(class);
        if state.status == RegistrationStatus::InProgress {
            return Err(BootstrapError::AlreadyInProgress { class });
        }

        let previous = state.status;
        let first_index = state.next_index;
        state.next_index += module_count;
        state.expected = module_count;
        state.settled = 0;
        for index in first_index..first_index + module_count {
            state.modules.insert(index, RegistrationStatus::Idle);
        }
        state.status = if module_count == 0 {
            RegistrationStatus::Ready
        } else {
            RegistrationStatus::InProgress
        };

        debug!(%class, modules = module_count, first_index, "registration started");

        Ok(RegistrationBatch {
            class,
            first_index,
            len: module_count,
            change: StatusChange {
                class,
                previous,
                current: state.status,
            },
        })
    }

    /// Mark a module of the current batch as registering.
    pub fn begin_module(&mut self, module: &ModuleId) {
        if let Some(status) = self.class_mut(module.class).modules.get_mut(&module.index)
            && *status == RegistrationStatus::Idle
        {
            *status = RegistrationStatus::InProgress;
        }
    }

    /// Record a module's outcome.
    ///
    /// Returns the class transition when this was the batch's last module.
    /// Unknown modules and repeated completions are ignored.
    pub fn complete_registration(
        &mut self,
        module: &ModuleId,
        outcome: Result<(), ModuleRegistrationError>,
    ) -> Option<StatusChange> {
        let state = self.class_mut(module.class);
        let Some(status) = state.modules.get_mut(&module.index) else {
            warn!(%module, "completion reported for unknown module, ignoring");
            return None;
        };
        if status.is_terminal() {
            warn!(%module, "module already settled, ignoring repeated completion");
            return None;
        }

        match outcome {
            Ok(()) => *status = RegistrationStatus::Ready,
            Err(err) => {
                *status = RegistrationStatus::Failed;
                state.errors.push(err);
            }
        }
        state.settled += 1;

        if state.settled < state.expected || state.status != RegistrationStatus::InProgress {
            return None;
        }

        let previous = state.status;
        state.status = RegistrationStatus::Ready;
        Some(StatusChange {
            class: module.class,
            previous,
            current: RegistrationStatus::Ready,
        })
    }

    /// Errors recorded for a class, in completion order.
    pub fn errors(&self, class: ModuleClass) -> &[ModuleRegistrationError] {
        &self.class(class).errors
    }

    /// Number of modules of a class that failed.
    pub fn failed_count(&self, class: ModuleClass) -> usize {
        self.class(class)
            .modules
            .values()
            .filter(|status| **status == RegistrationStatus::Failed)
            .count()
    }

    /// Number of modules of a class announced so far, across batches.
    pub fn module_count(&self, class: ModuleClass) -> usize {
        self.class(class).modules.len()
    }

    pub fn subscribe(&mut self, listener: StatusListener) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, listener));
        id
    }

    /// Remove a listener. Returns `false` if it was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() < before
    }

    /// Snapshot of the current listeners, to call outside the owner's lock.
    pub fn listeners(&self) -> Vec<StatusListener> {
        self.listeners
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect()
    }
}

impl fmt::Debug for RegistrationTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationTracker")
            .field("local", &self.local)
            .field("remote", &self.remote)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    fn failure(module: &ModuleId) -> Result<(), ModuleRegistrationError> {
        Err(ModuleRegistrationError::RegisterFailed {
            module: module.clone(),
            message: "boom".into(),
        })
    }

    #[test]
    fn is_ready_requires_both_classes() {
        use RegistrationStatus::*;
        assert!(is_ready(Ready, Ready));
        assert!(!is_ready(Ready, InProgress));
        assert!(!is_ready(Idle, Ready));
        assert!(!is_ready(Failed, Ready));
    }

    #[test]
    fn class_becomes_ready_when_all_modules_settle() {
        let mut tracker = RegistrationTracker::new();
        let batch = tracker.start_registration(ModuleClass::Local, 2).unwrap();
        assert_eq!(batch.change.current, RegistrationStatus::InProgress);

        let ids = batch.module_ids([None, None]);
        assert_eq!(tracker.complete_registration(&ids[0], Ok(())), None);
        assert_eq!(tracker.status(ModuleClass::Local), RegistrationStatus::InProgress);

        let change = tracker.complete_registration(&ids[1], Ok(())).unwrap();
        assert_eq!(change.previous, RegistrationStatus::InProgress);
        assert_eq!(change.current, RegistrationStatus::Ready);
    }

    #[test]
    fn failed_module_does_not_block_the_class() {
        let mut tracker = RegistrationTracker::new();
        let batch = tracker.start_registration(ModuleClass::Local, 2).unwrap();
        let ids = batch.module_ids([None, None]);

        tracker.complete_registration(&ids[0], failure(&ids[0]));
        tracker.complete_registration(&ids[1], Ok(()));

        assert_eq!(tracker.status(ModuleClass::Local), RegistrationStatus::Ready);
        assert_eq!(tracker.module_status(&ids[0]), RegistrationStatus::Failed);
        assert_eq!(tracker.module_status(&ids[1]), RegistrationStatus::Ready);
        assert_eq!(tracker.errors(ModuleClass::Local).len(), 1);
        assert_eq!(tracker.failed_count(ModuleClass::Local), 1);
    }

    #[test]
    fn starting_twice_while_in_progress_fails() {
        let mut tracker = RegistrationTracker::new();
        tracker.start_registration(ModuleClass::Remote, 1).unwrap();
        let err = tracker
            .start_registration(ModuleClass::Remote, 1)
            .unwrap_err();
        assert_eq!(
            err,
            BootstrapError::AlreadyInProgress {
                class: ModuleClass::Remote
            }
        );
        // The other class is independent.
        assert!(tracker.start_registration(ModuleClass::Local, 1).is_ok());
    }

    #[test]
    fn new_batch_after_completion_continues_indices() {
        let mut tracker = RegistrationTracker::new();
        let first = tracker.start_registration(ModuleClass::Local, 1).unwrap();
        let ids = first.module_ids([None]);
        tracker.complete_registration(&ids[0], Ok(()));

        let second = tracker.start_registration(ModuleClass::Local, 2).unwrap();
        assert_eq!(second.first_index, 1);
        assert_eq!(second.change.previous, RegistrationStatus::Ready);
        assert_eq!(tracker.module_count(ModuleClass::Local), 3);
    }

    #[test]
    fn empty_batch_is_ready_immediately() {
        let mut tracker = RegistrationTracker::new();
        let batch = tracker.start_registration(ModuleClass::Remote, 0).unwrap();
        assert_eq!(batch.change.current, RegistrationStatus::Ready);
        assert_eq!(tracker.status(ModuleClass::Remote), RegistrationStatus::Ready);
    }

    #[test]
    fn repeated_and_unknown_completions_are_ignored() {
        let mut tracker = RegistrationTracker::new();
        let batch = tracker.start_registration(ModuleClass::Local, 2).unwrap();
        let ids = batch.module_ids([None, None]);

        tracker.complete_registration(&ids[0], Ok(()));
        assert_eq!(tracker.complete_registration(&ids[0], Ok(())), None);
        assert_eq!(tracker.status(ModuleClass::Local), RegistrationStatus::InProgress);

        assert_eq!(
            tracker.complete_registration(&ModuleId::local(99), Ok(())),
            None
        );
    }

    #[test]
    fn begin_module_marks_in_progress() {
        let mut tracker = RegistrationTracker::new();
        let batch = tracker
            .start_registration(ModuleClass::Remote, 1)
            .unwrap();
        let ids = batch.module_ids([Some("shop")]);
        assert_eq!(ids[0].name.as_deref(), Some("shop"));
        assert_eq!(tracker.module_status(&ids[0]), RegistrationStatus::Idle);

        tracker.begin_module(&ids[0]);
        assert_eq!(tracker.module_status(&ids[0]), RegistrationStatus::InProgress);
    }

    #[test]
    fn listeners_can_be_removed() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut tracker = RegistrationTracker::new();
        let sink = Arc::clone(&seen);
        let id = tracker.subscribe(Arc::new(move |change: &StatusChange| {
            sink.lock().unwrap().push(change.current);
        }));

        let batch = tracker.start_registration(ModuleClass::Local, 0).unwrap();
        for listener in tracker.listeners() {
            listener(&batch.change);
        }
        assert_eq!(*seen.lock().unwrap(), vec![RegistrationStatus::Ready]);

        assert!(tracker.unsubscribe(id));
        assert!(!tracker.unsubscribe(id));
        assert!(tracker.listeners().is_empty());
    }
}
