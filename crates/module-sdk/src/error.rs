//! Errors returned to modules when a registration is rejected outright.
//!
//! Structural problems that depend on other modules (duplicate ids, missing
//! parents) are not reported here; the kernel collects those and reports them
//! when registrations are validated.

use thiserror::Error;

/// A registration call the kernel refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    /// A hoisted route also named a parent.
    #[error(
        "module '{module}': route '{route}' is hoisted and also names parent '{parent}'. Hoisted routes always attach to the root; drop one of the two options"
    )]
    HoistWithParent {
        module: String,
        route: String,
        parent: String,
    },

    /// Both `parent_id` and `parent_path` were given.
    #[error(
        "module '{module}': route '{route}' names both a parent id and a parent path; use exactly one"
    )]
    ConflictingParents { module: String, route: String },

    /// The module already enlisted a deferred callback.
    #[error("module '{module}': a deferred registration is already registered for this module")]
    DeferredAlreadyRegistered { module: String },

    /// A deferred callback tried to enlist another deferred callback.
    #[error(
        "module '{module}': deferred registrations can only be registered during the initial registration"
    )]
    DeferredOutsideRegistration { module: String },
}
