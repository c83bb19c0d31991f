//! Command-line arguments and configuration resolution.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use reaper_core::config::{DEFAULT_FAILURE_COLLECTION, DEFAULT_QUEUE_COLLECTION};
use reaper_core::{ReaperConfig, StoreConfig};

#[derive(Debug, Parser)]
#[command(name = "reaper")]
#[command(about = "Reclaim harvest queue items stuck in processing")]
#[command(version)]
pub struct Args {
    /// JSON file with SUPABASE_URL and SUPABASE_SERVICE_ROLE_KEY (optional)
    #[arg(long, default_value = "env.json")]
    pub env_file: PathBuf,

    /// Store endpoint, overrides the env file
    #[arg(long, env = "SUPABASE_URL")]
    pub url: Option<String>,

    /// Store credential, overrides the env file
    #[arg(long, env = "SUPABASE_SERVICE_ROLE_KEY", hide_env_values = true)]
    pub key: Option<String>,

    /// Minutes in processing after which an item counts as stuck
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..))]
    pub stale_after_mins: u64,

    /// Attempts at which a stuck item is failed instead of retried
    #[arg(long, default_value_t = 3)]
    pub max_retries: u32,

    #[arg(long, default_value = DEFAULT_QUEUE_COLLECTION)]
    pub queue_table: String,

    #[arg(long, default_value = DEFAULT_FAILURE_COLLECTION)]
    pub failure_table: String,

    /// Per-request timeout for store calls, in seconds
    #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout_secs: u64,

    /// Select and classify only, write nothing
    #[arg(long)]
    pub dry_run: bool,

    /// Print the run summary as JSON
    #[arg(long)]
    pub json: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Merge the env file with flags / environment into a validated config.
    pub fn reaper_config(&self) -> Result<ReaperConfig> {
        let from_file = load_env_file(&self.env_file)?;

        let endpoint = self
            .url
            .clone()
            .or_else(|| from_file.as_ref().map(|c| c.endpoint.clone()));
        let api_key = self
            .key
            .clone()
            .or_else(|| from_file.as_ref().map(|c| c.api_key.clone()));

        let (Some(endpoint), Some(api_key)) = (endpoint, api_key) else {
            bail!(
                "store connection not configured: pass --url/--key, set SUPABASE_URL and \
                 SUPABASE_SERVICE_ROLE_KEY, or provide {}",
                self.env_file.display()
            );
        };

        let Some(stale_after_secs) = self.stale_after_mins.checked_mul(60) else {
            bail!("--stale-after-mins {} is out of range", self.stale_after_mins);
        };

        let store = StoreConfig::new(endpoint, api_key)
            .with_timeout(Duration::from_secs(self.timeout_secs));
        let config = ReaperConfig::new(store)
            .with_staleness_threshold(Duration::from_secs(stale_after_secs))
            .with_max_retries(self.max_retries)
            .with_collections(&self.queue_table, &self.failure_table)
            .with_dry_run(self.dry_run);

        config.validate()?;
        Ok(config)
    }
}

/// Read the legacy env file; a missing file is not an error.
fn load_env_file(path: &Path) -> Result<Option<StoreConfig>> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let config = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(Some(config))
}
