//! Runtime configuration.
//!
//! Everything the scheduler, the translator and the remote client need is
//! carried in one [`Config`] value built at startup and handed to each
//! component when it is constructed.

use super::constants::*;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// What `chmod` does on the mirror.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChmodPolicy {
    /// Apply the mode change to the backing file
    #[default]
    Passthrough,
    /// Accept the call and leave the backing file untouched
    Ignore,
}

/// Credential material for the remote service.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Credentials {
    /// OAuth2 bearer token sent with every request
    pub bearer_token: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("bearer_token", &"<redacted>")
            .finish()
    }
}

/// Top-level configuration, usually read from a JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Handle of the local account
    pub handle: String,
    /// Credentials for the remote service
    pub credentials: Credentials,
    /// Base URL of the REST API
    pub api_base: String,
    /// Seconds between two sync cycles
    pub update_interval_secs: u64,
    /// How many of the local user's posts each cycle fetches
    pub user_tweets: usize,
    /// How many posts per friend each cycle fetches
    pub friend_tweets: usize,
    /// Per-request timeout of the HTTP client
    pub request_timeout_secs: u64,
    /// Behaviour of `chmod`
    pub chmod: ChmodPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            handle: String::new(),
            credentials: Credentials::default(),
            api_base: DEFAULT_API_BASE.to_string(),
            update_interval_secs: DEFAULT_UPDATE_INTERVAL_SECS,
            user_tweets: DEFAULT_USER_TWEETS,
            friend_tweets: DEFAULT_FRIEND_TWEETS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            chmod: ChmodPolicy::default(),
        }
    }
}

impl Config {
    /// Reads a configuration file.
    ///
    /// Missing fields fall back to their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config = serde_json::from_str(&content)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        Ok(config)
    }

    /// Applies `TWEETFS_HANDLE` and `TWEETFS_TOKEN` when they are set.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(handle) = env::var(ENV_HANDLE) {
            self.handle = handle;
        }
        if let Ok(token) = env::var(ENV_TOKEN) {
            self.credentials.bearer_token = token;
        }
        self
    }

    /// Checks the values a mount cannot run without.
    pub fn validate(&self) -> Result<()> {
        let handle = self.handle.trim();
        if handle.is_empty() {
            return Err(anyhow!("no local handle configured (set `handle` or {ENV_HANDLE})"));
        }
        if handle != self.handle || handle.contains('/') || handle == "." || handle == ".." {
            return Err(anyhow!("invalid local handle: {:?}", self.handle));
        }
        if self.update_interval_secs == 0 {
            return Err(anyhow!("update_interval_secs must be at least 1"));
        }
        Ok(())
    }

    /// Interval between two sync cycles.
    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.update_interval_secs)
    }

    /// Timeout applied to each remote request.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
