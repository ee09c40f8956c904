//! Connection settings for the remote fact store.

use std::time::Duration;
use thiserror::Error;

/// Table holding the facts unless overridden.
pub const DEFAULT_TABLE: &str = "facts";

/// Errors from reading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set - add it to .env or export it")]
    Missing(&'static str),

    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Settings for connecting to the Supabase project that stores the facts.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreConfig {
    /// Project URL, e.g. `https://abc.supabase.co`.
    pub url: String,

    /// Anonymous (public) API key.
    pub key: String,

    /// Table name.
    pub table: String,

    /// Whole-request timeout.
    pub timeout: Duration,

    /// TCP connect timeout.
    pub connect_timeout: Duration,
}

impl StoreConfig {
    /// Create a config for the given project URL and key.
    pub fn new(url: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            key: key.into(),
            table: DEFAULT_TABLE.to_string(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }

    /// Read `SUPABASE_URL`, `SUPABASE_KEY` and the optional `TIL_TABLE`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let url = lookup("SUPABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("SUPABASE_URL"))?;
        let key = lookup("SUPABASE_KEY")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("SUPABASE_KEY"))?;

        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ConfigError::Invalid {
                name: "SUPABASE_URL",
                reason: format!("expected an http(s) URL, got {url:?}"),
            });
        }

        let mut config = Self::new(url, key);
        if let Some(table) = lookup("TIL_TABLE").filter(|v| !v.trim().is_empty()) {
            config.table = table;
        }
        Ok(config)
    }

    /// Use a different table.
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    /// Set the whole-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}
