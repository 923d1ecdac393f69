//! Mosaic Module SDK
//!
//! Types and traits shared by the kernel, by modules and by plugins. Modules
//! depend on this crate only; the kernel implements [`host::ModuleRuntime`]
//! and drives the registration lifecycle.

pub mod error;
pub mod host;
pub mod logger;
pub mod plugin;
pub mod types;

pub use error::RegistrationError;
pub use host::{DeferredRegistration, ModuleRuntime, RegisterModule, SessionAccessor};
pub use logger::ModuleLogger;
pub use plugin::{Plugin, PluginError, PluginRegistry};

// Re-export serde_json so modules can build context and deferred payloads
#[doc(hidden)]
pub use serde_json;

pub mod prelude {
    pub use crate::error::RegistrationError;
    pub use crate::host::{DeferredRegistration, ModuleRuntime, RegisterModule, SessionAccessor};
    pub use crate::logger::ModuleLogger;
    pub use crate::plugin::{Plugin, PluginError, PluginRegistry};
    pub use crate::types::*;
}
