//! Module registration lifecycle.
//!
//! This module handles:
//! - Tracking how far each module class got ([`RegistrationTracker`])
//! - Running local and remote modules' register functions with per-module
//!   failure isolation
//! - Parsing the remotes manifest the host bootstraps from

mod bootstrap;
mod error;
mod manifest;
mod tracker;

use mosaic_sdk::types::ModuleId;

pub use bootstrap::{
    RemoteModuleLoader, register_deferred_registrations, register_local_modules,
    register_remote_modules, update_deferred_registrations,
};
pub use error::{BootstrapError, ModuleRegistrationError};
pub use manifest::{RemoteDefinition, RemotesManifest};
pub use tracker::{
    RegistrationBatch, RegistrationStatus, RegistrationTracker, StatusChange, StatusListener,
    SubscriptionId, is_ready,
};

/// Which registration pass produced a contribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RegistrationPhase {
    /// The module's register function.
    Initial,
    /// The module's deferred callback.
    Deferred,
}

/// Who registered something, and during which pass.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RegistrationOrigin {
    pub module: ModuleId,
    pub phase: RegistrationPhase,
}

impl RegistrationOrigin {
    pub fn initial(module: ModuleId) -> Self {
        Self {
            module,
            phase: RegistrationPhase::Initial,
        }
    }

    pub fn deferred(module: ModuleId) -> Self {
        Self {
            module,
            phase: RegistrationPhase::Deferred,
        }
    }
}
