//! Mosaic i18n plugin.
//!
//! Holds the application's current language and the translation instances
//! modules register against it. Language changes are broadcast to
//! subscribers so the rendering layer can re-render.

mod instance;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use mosaic_sdk::Plugin;
use parking_lot::Mutex;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

pub use instance::{DEFAULT_NAMESPACE, I18nInstance};

/// i18n plugin errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum I18nError {
    #[error("i18n plugin needs at least one supported language")]
    NoSupportedLanguages,

    /// The fallback is not one of the supported languages.
    #[error("fallback language '{fallback}' is not supported. Supported: {supported}")]
    UnsupportedFallback { fallback: String, supported: String },

    #[error("language '{language}' is not supported. Supported: {supported}")]
    UnsupportedLanguage { language: String, supported: String },

    #[error("i18n instance '{key}' is already registered")]
    DuplicateInstance { key: String },

    #[error("i18n instance '{key}' is not registered. Registered: {registered}")]
    InstanceNotFound { key: String, registered: String },
}

type LanguageListener = Arc<dyn Fn(&str) + Send + Sync>;

struct State {
    current: String,
    instances: HashMap<String, Arc<I18nInstance>>,
    listeners: Vec<LanguageListener>,
}

/// Language state and translation instances.
pub struct I18nPlugin {
    supported: Vec<String>,
    fallback: String,
    state: Mutex<State>,
}

impl I18nPlugin {
    /// Create the plugin. The fallback is the initial language.
    pub fn new(
        supported: impl IntoIterator<Item = impl Into<String>>,
        fallback: impl Into<String>,
    ) -> Result<Self, I18nError> {
        let supported: Vec<String> = supported.into_iter().map(Into::into).collect();
        let fallback = fallback.into();
        if supported.is_empty() {
            return Err(I18nError::NoSupportedLanguages);
        }
        if !supported.contains(&fallback) {
            return Err(I18nError::UnsupportedFallback {
                fallback,
                supported: supported.join(", "),
            });
        }

        Ok(Self {
            state: Mutex::new(State {
                current: fallback.clone(),
                instances: HashMap::new(),
                listeners: Vec::new(),
            }),
            supported,
            fallback,
        })
    }

    pub fn supported_languages(&self) -> &[String] {
        &self.supported
    }

    pub fn fallback_language(&self) -> &str {
        &self.fallback
    }

    pub fn register_instance(&self, key: &str, instance: I18nInstance) -> Result<(), I18nError> {
        let mut state = self.state.lock();
        if state.instances.contains_key(key) {
            return Err(I18nError::DuplicateInstance {
                key: key.to_string(),
            });
        }
        debug!(key, languages = ?instance.languages(), "i18n instance registered");
        state.instances.insert(key.to_string(), Arc::new(instance));
        Ok(())
    }

    pub fn instance(&self, key: &str) -> Result<Arc<I18nInstance>, I18nError> {
        let state = self.state.lock();
        state
            .instances
            .get(key)
            .cloned()
            .ok_or_else(|| {
                let mut registered: Vec<&str> =
                    state.instances.keys().map(String::as_str).collect();
                registered.sort_unstable();
                I18nError::InstanceNotFound {
                    key: key.to_string(),
                    registered: registered.join(", "),
                }
            })
    }

    /// Pick the best supported language for the user's preferences, most
    /// preferred first, and make it current.
    ///
    /// An exact match wins, then a base language match (`fr-CA` selects
    /// `fr`), then the fallback.
    pub fn detect_language<S: AsRef<str>>(&self, preferred: &[S]) -> String {
        let detected = preferred
            .iter()
            .find_map(|candidate| self.match_supported(candidate.as_ref()))
            .unwrap_or_else(|| self.fallback.clone());
        self.set_current(&detected);
        detected
    }

    pub fn change_language(&self, language: &str) -> Result<(), I18nError> {
        if !self.supported.iter().any(|s| s == language) {
            return Err(I18nError::UnsupportedLanguage {
                language: language.to_string(),
                supported: self.supported.join(", "),
            });
        }
        self.set_current(language);
        Ok(())
    }

    pub fn current_language(&self) -> String {
        self.state.lock().current.clone()
    }

    /// Call `listener` with the new language on every change.
    pub fn subscribe_language_changed(&self, listener: impl Fn(&str) + Send + Sync + 'static) {
        self.state.lock().listeners.push(Arc::new(listener));
    }

    /// Translate with a registered instance in the current language.
    pub fn translate(&self, instance: &str, key: &str, params: &Value) -> Result<String, I18nError> {
        let instance = self.instance(instance)?;
        Ok(instance.translate(&self.current_language(), &self.fallback, key, params))
    }

    fn match_supported(&self, candidate: &str) -> Option<String> {
        let candidate = candidate.trim();
        if let Some(exact) = self
            .supported
            .iter()
            .find(|s| s.eq_ignore_ascii_case(candidate))
        {
            return Some(exact.clone());
        }
        let base = candidate.split('-').next().unwrap_or(candidate);
        self.supported
            .iter()
            .find(|s| s.eq_ignore_ascii_case(base))
            .cloned()
    }

    fn set_current(&self, language: &str) {
        let mut state = self.state.lock();
        if state.current == language {
            return;
        }
        state.current = language.to_string();
        let listeners = state.listeners.clone();
        drop(state);

        info!(language, "language changed");
        for listener in listeners {
            listener(language);
        }
    }
}

impl fmt::Debug for I18nPlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("I18nPlugin")
            .field("supported", &self.supported)
            .field("fallback", &self.fallback)
            .field("current", &state.current)
            .field("instances", &state.instances.len())
            .finish()
    }
}

impl Plugin for I18nPlugin {
    fn name(&self) -> &'static str {
        "mosaic-i18n"
    }
}
