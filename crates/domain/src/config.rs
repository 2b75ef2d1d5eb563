//! Configuration structures consumed by the infrastructure layer.

use serde::{Deserialize, Serialize};

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub http: HttpConfig,
    pub scheduler: SchedulerConfig,
    pub extract: ExtractConfig,
    pub ingest: IngestConfig,
}

/// Database settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    pub pool_size: u32,
}

/// Outbound HTTP settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub timeout_seconds: u64,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { timeout_seconds: 30, user_agent: "Gather/1.0".into() }
    }
}

/// Sweep + retry settings for the ingestion scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Cron line for the due-source sweep.
    pub sweep_cron: String,
    /// Cron line for the cross-source dedup sweep.
    pub dedup_sweep_cron: String,
    /// Number of ingest queue workers.
    pub workers: usize,
    /// Retry cap for most adapters.
    pub max_attempts: u32,
    /// Retry cap for AI extraction runs.
    pub extract_max_attempts: u32,
    /// Upper bound for the per-source stagger delay, in seconds.
    pub stagger_max_seconds: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            sweep_cron: "0 */15 * * * *".into(), // every 15 minutes
            dedup_sweep_cron: "0 30 */4 * * *".into(),
            workers: 4,
            max_attempts: 3,
            extract_max_attempts: 2,
            stagger_max_seconds: 60,
        }
    }
}

/// AI page-extraction API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractConfig {
    pub api_url: String,
    pub api_key: Option<String>,
    pub timeout_seconds: u64,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.firecrawl.dev/v1/scrape".into(),
            api_key: None,
            timeout_seconds: 60,
        }
    }
}

/// Ingestion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Designated owner for scraper-created calendars. Injected explicitly
    /// instead of looked up per call.
    pub system_owner: String,
}
