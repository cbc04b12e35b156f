//! Generator configuration
//!
//! Loaded from TOML, optionally overridden from the environment, and passed
//! by value into the orchestrator. Nothing here is process-global.

use crate::budget::Budgets;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use uigen_policy::{AllowList, DEFAULT_ALLOWED};
use uigen_stream::{HttpGenerationService, ServiceConfig};

/// Environment variable overriding `service.base_url`
pub const ENV_BASE_URL: &str = "UIGEN_BASE_URL";
/// Environment variable overriding `service.model`
pub const ENV_MODEL: &str = "UIGEN_MODEL";
/// Environment variable overriding `service.api_key`
pub const ENV_API_KEY: &str = "UIGEN_API_KEY";

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Continuation and rewrite limits
    pub budgets: Budgets,
    /// Output ceiling per call, in tokens
    pub max_output_tokens: u32,
    /// Local retries per call on retryable transport errors
    pub transport_retries: u32,
    /// Bound on one call (open plus full stream), in seconds
    pub call_timeout_secs: u64,
    /// Exact module identifiers a component may import
    pub allow_list: Vec<String>,
    /// Concurrent requests in batch generation
    pub batch_concurrency: usize,
    /// Generation service connection
    pub service: ServiceConfig,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            budgets: Budgets::default(),
            max_output_tokens: 2000,
            transport_retries: 2,
            call_timeout_secs: 60,
            allow_list: DEFAULT_ALLOWED.iter().map(|m| (*m).to_string()).collect(),
            batch_concurrency: 4,
            service: ServiceConfig::default(),
        }
    }
}

impl GeneratorConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate TOML
    ///
    /// # Errors
    /// Returns error on malformed TOML or invalid values.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a TOML file, apply environment overrides, validate
    ///
    /// # Errors
    /// Returns error if the file cannot be read or is invalid.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::io_error(path, e))?;
        let mut config: Self = toml::from_str(&text)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Apply `UIGEN_*` overrides using `lookup` for variable values
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_BASE_URL) {
            self.service.base_url = url;
        }
        if let Some(model) = lookup(ENV_MODEL) {
            self.service.model = model;
        }
        if let Some(key) = lookup(ENV_API_KEY) {
            self.service.api_key = Some(key);
        }
    }

    /// Check value ranges
    ///
    /// # Errors
    /// Returns error for a zero token ceiling, zero timeout, zero batch
    /// concurrency or a bad allow-list entry.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_output_tokens == 0 {
            return Err(ConfigError::Invalid("max_output_tokens must be > 0".into()));
        }
        if self.call_timeout_secs == 0 {
            return Err(ConfigError::Invalid("call_timeout_secs must be > 0".into()));
        }
        if self.batch_concurrency == 0 {
            return Err(ConfigError::Invalid("batch_concurrency must be > 0".into()));
        }
        self.allow_list()?;
        Ok(())
    }

    /// Allow-list value
    ///
    /// # Errors
    /// Returns error for empty or whitespace-containing entries.
    pub fn allow_list(&self) -> Result<AllowList, ConfigError> {
        Ok(AllowList::new(self.allow_list.iter().cloned())?)
    }

    /// Per-call timeout
    #[inline]
    #[must_use]
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    /// HTTP generation service for `service`
    ///
    /// # Errors
    /// Returns error if the client cannot be built.
    pub fn http_service(&self) -> Result<HttpGenerationService, ConfigError> {
        Ok(HttpGenerationService::new(self.service.clone())?)
    }

    /// With budgets
    #[inline]
    #[must_use]
    pub fn with_budgets(mut self, budgets: Budgets) -> Self {
        self.budgets = budgets;
        self
    }

    /// With allow-list
    #[must_use]
    pub fn with_allow_list<I, S>(mut self, modules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allow_list = modules.into_iter().map(Into::into).collect();
        self
    }

    /// With transport retries
    #[inline]
    #[must_use]
    pub fn with_transport_retries(mut self, retries: u32) -> Self {
        self.transport_retries = retries;
        self
    }

    /// With per-call timeout
    #[inline]
    #[must_use]
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout_secs = timeout.as_secs().max(1);
        self
    }

    /// With output ceiling
    #[inline]
    #[must_use]
    pub fn with_max_output_tokens(mut self, tokens: u32) -> Self {
        self.max_output_tokens = tokens;
        self
    }
}
