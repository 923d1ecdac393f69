//! Parser for the remotes manifest.
//!
//! The host lists the remote modules it bootstraps in a TOML file:
//!
//! ```toml
//! [[remotes]]
//! name = "shop"
//! url = "https://cdn.example.com/shop/remoteEntry.js"
//! ```

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// A remote module to load at bootstrap.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteDefinition {
    /// Remote name; identifies the module in logs and errors.
    pub name: String,

    /// Where the loader fetches the remote from. Loaders may resolve the
    /// location from the name alone.
    #[serde(default)]
    pub url: Option<String>,
}

impl RemoteDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

/// Remotes listed in a manifest, in bootstrap order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RemotesManifest {
    #[serde(default)]
    pub remotes: Vec<RemoteDefinition>,
}

impl RemotesManifest {
    /// Parse a manifest file.
    pub fn parse(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read remotes manifest: {}", path.display()))?;

        Self::parse_str(&content, path)
    }

    /// Parse a manifest from a TOML string. `path` is only used in messages.
    pub fn parse_str(content: &str, path: &Path) -> Result<Self> {
        let manifest: RemotesManifest = toml::from_str(content)
            .with_context(|| format!("failed to parse remotes manifest at {}", path.display()))?;

        manifest.validate(path)?;
        Ok(manifest)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        let mut seen = HashSet::new();
        for (position, remote) in self.remotes.iter().enumerate() {
            if remote.name.trim().is_empty() {
                anyhow::bail!(
                    "remote #{position} in {} has an empty 'name' field",
                    path.display()
                );
            }
            if !seen.insert(remote.name.as_str()) {
                anyhow::bail!(
                    "remote '{}' is listed more than once in {}",
                    remote.name,
                    path.display()
                );
            }
            if let Some(url) = &remote.url
                && url.trim().is_empty()
            {
                anyhow::bail!(
                    "remote '{}' in {} has an empty 'url'; omit the field to let the loader resolve it",
                    remote.name,
                    path.display()
                );
            }
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.remotes.is_empty()
    }
}
