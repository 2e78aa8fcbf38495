// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Client configuration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, TextwerkError};

/// Region used when nothing else is configured.
pub const DEFAULT_REGION: &str = "us-east-1";

const CONFIG_FILE: &str = "config.json";

/// Settings shared by every transport and by the job poller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Service endpoint (scheme + host, optionally a port).
    pub endpoint: String,
    /// Region the endpoint belongs to.
    pub region: String,
    /// Whole-request timeout.
    pub request_timeout_secs: u64,
    /// TCP connect timeout.
    pub connect_timeout_secs: u64,
    /// Delay between two Get calls while a job is IN_PROGRESS.
    pub poll_interval_ms: u64,
    /// Give up polling after this many Get calls (`None` = poll forever).
    pub max_poll_attempts: Option<u32>,
    pub user_agent: String,
    /// Extra headers attached to every request, e.g. for a signing proxy.
    pub default_headers: BTreeMap<String, String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: endpoint_for_region(DEFAULT_REGION),
            region: DEFAULT_REGION.into(),
            request_timeout_secs: 60,
            connect_timeout_secs: 10,
            poll_interval_ms: 5_000,
            max_poll_attempts: None,
            user_agent: format!("textwerk/{}", env!("CARGO_PKG_VERSION")),
            default_headers: BTreeMap::new(),
        }
    }
}

/// Public endpoint for a region.
pub fn endpoint_for_region(region: &str) -> String {
    format!("https://textract.{region}.amazonaws.com")
}

impl ClientConfig {
    /// Defaults pointed at another region.
    pub fn for_region(region: &str) -> Self {
        Self {
            endpoint: endpoint_for_region(region),
            region: region.into(),
            ..Self::default()
        }
    }

    /// Defaults pointed at an explicit endpoint (stub servers, proxies).
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    /// Load a config file written by [`ClientConfig::save`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&data)?;
        config.validate()?;
        debug!(path = %path.display(), "loaded client config");
        Ok(config)
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Persist as pretty JSON, creating the parent directory if needed.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Apply `TEXTWERK_*` environment overrides.
    pub fn apply_env(mut self) -> Result<Self> {
        if let Ok(region) = std::env::var("TEXTWERK_REGION") {
            self.endpoint = endpoint_for_region(&region);
            self.region = region;
        }
        if let Ok(endpoint) = std::env::var("TEXTWERK_ENDPOINT") {
            self.endpoint = endpoint;
        }
        if let Ok(interval) = std::env::var("TEXTWERK_POLL_INTERVAL_MS") {
            self.poll_interval_ms = interval.parse().map_err(|e| {
                TextwerkError::Config(format!("TEXTWERK_POLL_INTERVAL_MS '{interval}': {e}"))
            })?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Reject settings no transport could work with.
    pub fn validate(&self) -> Result<()> {
        if self.endpoint.trim().is_empty() {
            return Err(TextwerkError::Config("endpoint must not be empty".into()));
        }
        if !(self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://")) {
            return Err(TextwerkError::Config(format!(
                "endpoint '{}' must start with http:// or https://",
                self.endpoint
            )));
        }
        if self.request_timeout_secs == 0 || self.connect_timeout_secs == 0 {
            return Err(TextwerkError::Config("timeouts must be non-zero".into()));
        }
        if self.poll_interval_ms == 0 {
            return Err(TextwerkError::Config("poll interval must be non-zero".into()));
        }
        if self.max_poll_attempts == Some(0) {
            return Err(TextwerkError::Config(
                "max poll attempts must be at least 1; omit it to poll without limit".into(),
            ));
        }
        Ok(())
    }
}

/// Default config file location: `$XDG_CONFIG_HOME/textwerk/config.json`.
pub fn default_config_path() -> PathBuf {
    config_dir().join("textwerk").join(CONFIG_FILE)
}

fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg);
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".config");
    }
    PathBuf::from(".")
}
