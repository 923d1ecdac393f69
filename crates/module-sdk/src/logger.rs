//! Logging accessor handed to module code.
//!
//! Events go through `tracing`, tagged with the module that emitted them, so
//! the host's subscriber decides where they end up.

use tracing::{debug, error, info, warn};

use crate::types::ModuleId;

/// Logger scoped to one module.
#[derive(Debug, Clone)]
pub struct ModuleLogger {
    module: ModuleId,
}

impl ModuleLogger {
    pub fn new(module: ModuleId) -> Self {
        Self { module }
    }

    pub fn module(&self) -> &ModuleId {
        &self.module
    }

    pub fn debug(&self, message: &str) {
        debug!(module = %self.module, "{message}");
    }

    pub fn info(&self, message: &str) {
        info!(module = %self.module, "{message}");
    }

    pub fn warning(&self, message: &str) {
        warn!(module = %self.module, "{message}");
    }

    pub fn error(&self, message: &str) {
        error!(module = %self.module, "{message}");
    }
}
