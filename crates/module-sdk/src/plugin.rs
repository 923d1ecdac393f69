//! Typed plugin registry.
//!
//! Plugins are constructed by the host, attached once when the runtime is
//! built, and looked up by their concrete type. The registry hands back an
//! `Arc<P>`, so callers never downcast themselves.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

/// An extension attached to the runtime.
///
/// Plugins own their readiness state; the kernel only reports it.
pub trait Plugin: Any + Send + Sync {
    /// Stable name used in logs and error messages.
    fn name(&self) -> &'static str;

    /// Whether the plugin finished its own startup protocol.
    fn is_ready(&self) -> bool {
        true
    }
}

/// Errors raised by plugin lookup and attachment.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PluginError {
    /// No plugin of the requested type was attached.
    #[error("plugin '{name}' is not attached to the runtime. Attached plugins: {attached}")]
    NotFound { name: String, attached: String },

    /// Two plugins of the same type were attached.
    #[error("plugin '{name}' is already attached; each plugin type can be attached once")]
    Duplicate { name: String },
}

struct Entry {
    name: &'static str,
    erased: Arc<dyn Any + Send + Sync>,
    plugin: Arc<dyn Plugin>,
}

/// Plugins attached to a runtime, keyed by concrete type.
#[derive(Default)]
pub struct PluginRegistry {
    entries: HashMap<TypeId, Entry>,
    /// Attachment order, for deterministic listing.
    order: Vec<TypeId>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a plugin.
    pub fn attach<P: Plugin>(&mut self, plugin: Arc<P>) -> Result<(), PluginError> {
        let key = TypeId::of::<P>();
        if self.entries.contains_key(&key) {
            return Err(PluginError::Duplicate {
                name: plugin.name().to_string(),
            });
        }

        let entry = Entry {
            name: plugin.name(),
            erased: plugin.clone(),
            plugin,
        };
        self.entries.insert(key, entry);
        self.order.push(key);
        Ok(())
    }

    /// Look up a plugin by type.
    pub fn get<P: Plugin>(&self) -> Result<Arc<P>, PluginError> {
        self.entries
            .get(&TypeId::of::<P>())
            .and_then(|entry| Arc::clone(&entry.erased).downcast::<P>().ok())
            .ok_or_else(|| PluginError::NotFound {
                name: std::any::type_name::<P>().to_string(),
                attached: self.names().join(", "),
            })
    }

    /// Look up a plugin by name, for callers that only need the trait.
    pub fn get_by_name(&self, name: &str) -> Result<Arc<dyn Plugin>, PluginError> {
        self.entries
            .values()
            .find(|entry| entry.name == name)
            .map(|entry| Arc::clone(&entry.plugin))
            .ok_or_else(|| PluginError::NotFound {
                name: name.to_string(),
                attached: self.names().join(", "),
            })
    }

    pub fn contains<P: Plugin>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<P>())
    }

    /// Names of attached plugins, in attachment order.
    pub fn names(&self) -> Vec<&'static str> {
        self.order
            .iter()
            .filter_map(|key| self.entries.get(key))
            .map(|entry| entry.name)
            .collect()
    }

    /// Plugins that have not reported ready yet.
    pub fn pending(&self) -> Vec<&'static str> {
        self.order
            .iter()
            .filter_map(|key| self.entries.get(key))
            .filter(|entry| !entry.plugin.is_ready())
            .map(|entry| entry.name)
            .collect()
    }

    pub fn all_ready(&self) -> bool {
        self.entries.values().all(|entry| entry.plugin.is_ready())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("plugins", &self.names())
            .finish()
    }
}
