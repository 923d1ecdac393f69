//! Configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use mosaic_sdk::types::RuntimeMode;

use crate::registration::RemotesManifest;

/// Host configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Runtime mode exposed to modules (default: development).
    pub mode: RuntimeMode,

    /// Default tracing filter when `RUST_LOG` is unset (default: "info").
    pub log_filter: String,

    /// Path to the remotes manifest. When None, no remotes are bootstrapped.
    pub remotes_manifest: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: RuntimeMode::Development,
            log_filter: "info".to_string(),
            remotes_manifest: None,
        }
    }
}

impl Config {
    /// Load configuration from the process environment, after reading a
    /// `.env` file if one exists.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_env()
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mode = match lookup("MOSAIC_MODE") {
            Some(value) => value
                .parse::<RuntimeMode>()
                .map_err(|err: String| anyhow!(err))
                .context("MOSAIC_MODE must be 'development' or 'production'")?,
            None => RuntimeMode::default(),
        };

        let log_filter = lookup("MOSAIC_LOG")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "info".to_string());

        let remotes_manifest = lookup("MOSAIC_REMOTES_MANIFEST")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            mode,
            log_filter,
            remotes_manifest,
        })
    }

    /// The configured remotes, or an empty manifest when none is configured.
    pub fn remotes(&self) -> Result<RemotesManifest> {
        match &self.remotes_manifest {
            Some(path) => RemotesManifest::parse(path),
            None => Ok(RemotesManifest::default()),
        }
    }
}
