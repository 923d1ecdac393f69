//! Deferred registrations.
//!
//! Second-phase module callbacks that run once the host supplies global data
//! (session, feature flags) and every module finished its initial
//! registration.

mod coordinator;

use thiserror::Error;

pub use coordinator::{DeferredCoordinator, DeferredInvocation, DeferredStatus};

/// Misuse of the deferred registration entry points.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeferredError {
    /// Deferred data was already supplied.
    #[error(
        "deferred registrations were already registered; use update_deferred_registrations to supply new data"
    )]
    AlreadyRegistered,

    /// An update was requested before the first deferred pass ran.
    #[error(
        "deferred registrations have not run yet; call register_deferred_registrations and wait for modules to be ready before updating"
    )]
    NotRegistered,

    /// A callback from the previous pass has not settled.
    #[error("module '{module}': deferred registration is still running; wait for it to settle before updating")]
    StillRunning { module: String },
}
