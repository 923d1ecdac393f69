//! Runtime construction options.

use std::fmt;
use std::sync::Arc;

use mosaic_sdk::types::RuntimeMode;
use mosaic_sdk::{Plugin, PluginError, PluginRegistry, SessionAccessor};

use crate::config::Config;

/// Options accepted by [`Runtime::new`](super::Runtime::new).
#[derive(Default)]
pub struct RuntimeOptions {
    pub mode: RuntimeMode,
    pub plugins: PluginRegistry,
    pub session_accessor: Option<Arc<dyn SessionAccessor>>,
}

impl RuntimeOptions {
    pub fn builder() -> RuntimeOptionsBuilder {
        RuntimeOptionsBuilder::default()
    }

    /// Options carrying the configured mode, without plugins.
    pub fn from_config(config: &Config) -> Self {
        Self {
            mode: config.mode,
            ..Self::default()
        }
    }
}

impl fmt::Debug for RuntimeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeOptions")
            .field("mode", &self.mode)
            .field("plugins", &self.plugins.names())
            .field("session_accessor", &self.session_accessor.is_some())
            .finish()
    }
}

/// Builder for [`RuntimeOptions`].
///
/// Plugin attach errors are kept and reported by [`build`](Self::build), so
/// the chain reads top to bottom.
#[derive(Default)]
pub struct RuntimeOptionsBuilder {
    options: RuntimeOptions,
    error: Option<PluginError>,
}

impl RuntimeOptionsBuilder {
    pub fn mode(mut self, mode: RuntimeMode) -> Self {
        self.options.mode = mode;
        self
    }

    /// Attach a plugin. Attaching two plugins of the same type fails the build.
    pub fn plugin<P: Plugin>(mut self, plugin: Arc<P>) -> Self {
        if let Err(err) = self.options.plugins.attach(plugin)
            && self.error.is_none()
        {
            self.error = Some(err);
        }
        self
    }

    pub fn session_accessor(mut self, accessor: impl SessionAccessor + 'static) -> Self {
        self.options.session_accessor = Some(Arc::new(accessor));
        self
    }

    pub fn build(self) -> Result<RuntimeOptions, PluginError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.options),
        }
    }
}
