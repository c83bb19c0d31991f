//! Reaper configuration.
//!
//! The store connection is resolved by the caller (CLI flags, environment, or
//! the legacy `env.json` file) and handed over as an explicit struct.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::{ReaperError, DEFAULT_MAX_RETRIES};

pub const DEFAULT_STALENESS_THRESHOLD: Duration = Duration::from_secs(10 * 60);
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_QUEUE_COLLECTION: &str = "knowledge_harvest_queue";
pub const DEFAULT_FAILURE_COLLECTION: &str = "failed_topics";

/// Connection parameters for the record store.
///
/// Field names match the keys of the `env.json` file the harvester tooling
/// already ships.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(rename = "SUPABASE_URL")]
    pub endpoint: String,

    #[serde(rename = "SUPABASE_SERVICE_ROLE_KEY")]
    pub api_key: String,

    /// Transport-level timeout applied to every call.
    #[serde(skip, default = "default_timeout")]
    pub timeout: Duration,
}

fn default_timeout() -> Duration {
    DEFAULT_STORE_TIMEOUT
}

impl StoreConfig {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Endpoint without trailing slashes.
    pub fn base_url(&self) -> &str {
        self.endpoint.trim_end_matches('/')
    }

    pub fn validate(&self) -> Result<(), ReaperError> {
        if self.base_url().trim().is_empty() {
            return Err(ReaperError::Config("store endpoint is empty".to_string()));
        }
        if !(self.base_url().starts_with("http://") || self.base_url().starts_with("https://")) {
            return Err(ReaperError::Config(format!(
                "store endpoint must be an http(s) URL, got {:?}",
                self.endpoint
            )));
        }
        if self.api_key.trim().is_empty() {
            return Err(ReaperError::Config("store credential is empty".to_string()));
        }
        if self.timeout.is_zero() {
            return Err(ReaperError::Config("store timeout must be positive".to_string()));
        }
        Ok(())
    }
}

// The credential never reaches logs.
impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Everything one sweep needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaperConfig {
    pub store: StoreConfig,

    /// Processing items idle for strictly longer than this are stuck.
    pub staleness_threshold: Duration,

    /// Attempts at which an item is given up instead of retried.
    pub max_retries: u32,

    pub queue_collection: String,
    pub failure_collection: String,

    /// Select and classify only; no writes.
    pub dry_run: bool,
}

impl ReaperConfig {
    pub fn new(store: StoreConfig) -> Self {
        Self {
            store,
            staleness_threshold: DEFAULT_STALENESS_THRESHOLD,
            max_retries: DEFAULT_MAX_RETRIES,
            queue_collection: DEFAULT_QUEUE_COLLECTION.to_string(),
            failure_collection: DEFAULT_FAILURE_COLLECTION.to_string(),
            dry_run: false,
        }
    }

    pub fn with_staleness_threshold(mut self, threshold: Duration) -> Self {
        self.staleness_threshold = threshold;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_collections(
        mut self,
        queue: impl Into<String>,
        failures: impl Into<String>,
    ) -> Self {
        self.queue_collection = queue.into();
        self.failure_collection = failures.into();
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Fail fast before any store traffic.
    pub fn validate(&self) -> Result<(), ReaperError> {
        self.store.validate()?;
        if self.queue_collection.trim().is_empty() || self.failure_collection.trim().is_empty() {
            return Err(ReaperError::Config("collection names must not be empty".to_string()));
        }
        Ok(())
    }
}
