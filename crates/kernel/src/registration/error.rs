//! Registration error types with clear, actionable messages.
//!
//! Module failures are recorded, not propagated: each error names the module
//! so a broken module can be found from the log alone.

use mosaic_sdk::types::{ModuleClass, ModuleId};
use thiserror::Error;

/// A failure isolated to a single module.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModuleRegistrationError {
    /// The module's register function returned an error.
    #[error("module '{module}': registration failed: {message}")]
    RegisterFailed { module: ModuleId, message: String },

    /// The module's register function panicked.
    #[error("module '{module}': registration panicked: {message}")]
    Panicked { module: ModuleId, message: String },

    /// The remote's code could not be loaded.
    #[error("module '{module}': failed to load remote module: {message}")]
    LoadFailed { module: ModuleId, message: String },

    /// The module's deferred callback returned an error or panicked.
    #[error("module '{module}': deferred registration failed: {message}")]
    DeferredFailed { module: ModuleId, message: String },
}

impl ModuleRegistrationError {
    /// The module the failure belongs to.
    pub fn module(&self) -> &ModuleId {
        match self {
            Self::RegisterFailed { module, .. }
            | Self::Panicked { module, .. }
            | Self::LoadFailed { module, .. }
            | Self::DeferredFailed { module, .. } => module,
        }
    }

    /// Create a register failure from any error, keeping its cause chain.
    pub fn register_failed(module: ModuleId, error: &anyhow::Error) -> Self {
        Self::RegisterFailed {
            module,
            message: format!("{error:#}"),
        }
    }

    /// Create a panic error from a caught panic payload.
    pub fn panicked(module: ModuleId, payload: &(dyn std::any::Any + Send)) -> Self {
        Self::Panicked {
            module,
            message: panic_message(payload),
        }
    }
}

/// Errors raised by the bootstrap functions themselves.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BootstrapError {
    /// A batch for this class is still registering.
    #[error(
        "{class} modules are already registering; wait for the current batch to settle before registering more"
    )]
    AlreadyInProgress { class: ModuleClass },
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
