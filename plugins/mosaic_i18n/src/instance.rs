//! Translation resources.

use std::collections::HashMap;

use serde_json::Value;

/// Namespace used when a key carries none.
pub const DEFAULT_NAMESPACE: &str = "translation";

type Namespaces = HashMap<String, HashMap<String, String>>;

/// Translation resources for one part of the application.
///
/// Resources are grouped by language, then namespace. Keys are written
/// `namespace:key`, or just `key` for the default namespace.
#[derive(Debug, Clone, Default)]
pub struct I18nInstance {
    resources: HashMap<String, Namespaces>,
}

impl I18nInstance {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add resources for a language and namespace. Later additions override
    /// earlier ones key by key.
    pub fn with_resources<K, V>(
        mut self,
        language: &str,
        namespace: &str,
        entries: impl IntoIterator<Item = (K, V)>,
    ) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.add_resources(language, namespace, entries);
        self
    }

    pub fn add_resources<K, V>(
        &mut self,
        language: &str,
        namespace: &str,
        entries: impl IntoIterator<Item = (K, V)>,
    ) where
        K: Into<String>,
        V: Into<String>,
    {
        let bundle = self
            .resources
            .entry(language.to_string())
            .or_default()
            .entry(namespace.to_string())
            .or_default();
        bundle.extend(entries.into_iter().map(|(k, v)| (k.into(), v.into())));
    }

    /// Languages with at least one resource.
    pub fn languages(&self) -> Vec<&str> {
        let mut languages: Vec<&str> = self.resources.keys().map(String::as_str).collect();
        languages.sort_unstable();
        languages
    }

    /// Look a key up in `language`, then its base language (`fr-CA` to
    /// `fr`), then `fallback`.
    pub fn lookup(&self, language: &str, fallback: &str, key: &str) -> Option<&str> {
        let (namespace, key) = key.split_once(':').unwrap_or((DEFAULT_NAMESPACE, key));
        candidates(language, fallback).into_iter().find_map(|lang| {
            self.resources
                .get(lang)?
                .get(namespace)?
                .get(key)
                .map(String::as_str)
        })
    }

    /// Translate `key`, substituting `{{name}}` placeholders from `params`.
    /// Missing keys translate to the key itself.
    pub fn translate(&self, language: &str, fallback: &str, key: &str, params: &Value) -> String {
        match self.lookup(language, fallback, key) {
            Some(template) => interpolate(template, params),
            None => key.to_string(),
        }
    }
}

fn candidates<'a>(language: &'a str, fallback: &'a str) -> Vec<&'a str> {
    let mut candidates = vec![language];
    if let Some((base, _)) = language.split_once('-') {
        candidates.push(base);
    }
    if !candidates.contains(&fallback) {
        candidates.push(fallback);
    }
    candidates
}

fn interpolate(template: &str, params: &Value) -> String {
    let Some(params) = params.as_object() else {
        return template.to_string();
    };
    params.iter().fold(template.to_string(), |text, (name, value)| {
        let replacement = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        text.replace(&format!("{{{{{name}}}}}"), &replacement)
    })
}
