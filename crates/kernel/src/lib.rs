//! Mosaic Kernel Library
//!
//! Registration lifecycle and aggregation engine for micro-frontend modules.
//! Hosts build a [`Runtime`], bootstrap local and remote modules through the
//! [`registration`] entry points, then read the merged route tree and
//! navigation menus once the runtime reports ready.

pub mod config;
pub mod deferred;
pub mod error;
pub mod logging;
pub mod navigation;
pub mod registration;
pub mod route;
pub mod runtime;

pub use config::Config;
pub use error::ValidationError;
pub use registration::{
    RemoteModuleLoader, register_deferred_registrations, register_local_modules,
    register_remote_modules, update_deferred_registrations,
};
pub use runtime::{ModuleScope, Runtime, RuntimeOptions, RuntimeState};
