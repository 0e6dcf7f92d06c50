use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, ValueEnum};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::cache::CacheTtls;
use crate::jobs::JobRetryPolicy;
use crate::providers::openrouter::{DEFAULT_ENDPOINT, DEFAULT_MODEL, OpenRouterConfig, RetryPolicy};
use crate::translation::TranslationOptions;

/// Application configuration module
/// Every setting can come from a command line flag, an environment variable
/// or a JSON file, and falls back to a default when absent.
#[derive(Debug, Clone, Serialize, Deserialize, Args)]
pub struct Config {
    /// L1 lifetime of full-text entries, in seconds
    #[arg(long, env = "L1_CACHE_TTL", default_value_t = default_l1_ttl_secs())]
    #[serde(default = "default_l1_ttl_secs")]
    pub l1_ttl_secs: u64,

    /// Lifetime of chunk entries in both tiers, in seconds
    #[arg(long, env = "CHUNK_CACHE_TTL", default_value_t = default_chunk_ttl_secs())]
    #[serde(default = "default_chunk_ttl_secs")]
    pub chunk_ttl_secs: u64,

    /// L2 lifetime of full-text entries, in seconds
    #[arg(long, env = "CACHE_TTL", default_value_t = default_cache_ttl_secs())]
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Shared cache URL (redis://...); an in-process tier is used when unset
    #[arg(long, env = "CACHE_URL")]
    #[serde(default)]
    pub cache_url: Option<String>,

    /// Upper bound of in-flight upstream requests
    #[arg(long, env = "HTTPX_MAX_CONNECTIONS", default_value_t = default_max_connections())]
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    /// Upper bound of idle pooled upstream connections
    #[arg(long, env = "HTTPX_MAX_KEEPALIVE", default_value_t = default_max_keepalive())]
    #[serde(default = "default_max_keepalive")]
    pub max_keepalive: usize,

    /// Chunks translated concurrently by a background job
    #[arg(long, env = "PARALLEL_CHUNK_LIMIT", default_value_t = default_parallel_chunk_limit())]
    #[serde(default = "default_parallel_chunk_limit")]
    pub parallel_chunk_limit: usize,

    /// Texts longer than this many characters go to a background job
    #[arg(long, env = "ASYNC_TRANSLATE_THRESHOLD", default_value_t = default_async_threshold())]
    #[serde(default = "default_async_threshold")]
    pub async_threshold: usize,

    /// Retries of a rate-limited upstream call
    #[arg(long, env = "UPSTREAM_MAX_RETRIES", default_value_t = default_max_retries())]
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// First backoff after a 429 without Retry-After, in seconds
    #[arg(long, env = "UPSTREAM_RETRY_BACKOFF", default_value_t = default_retry_backoff_secs())]
    #[serde(default = "default_retry_backoff_secs")]
    pub retry_backoff_secs: u64,

    /// Cap of the computed backoff, in seconds
    #[arg(long, env = "UPSTREAM_MAX_BACKOFF", default_value_t = default_max_backoff_secs())]
    #[serde(default = "default_max_backoff_secs")]
    pub max_backoff_secs: u64,

    /// Per-call upstream timeout, in seconds
    #[arg(long, env = "UPSTREAM_TIMEOUT", default_value_t = default_request_timeout_secs())]
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Maximum characters per chunk
    #[arg(long, env = "MAX_CHARS_PER_REQUEST", default_value_t = default_max_chars_per_request())]
    #[serde(default = "default_max_chars_per_request")]
    pub max_chars_per_request: usize,

    /// Chat completions endpoint
    #[arg(long, env = "OPENROUTER_URL", default_value_t = default_endpoint())]
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Model identifier
    #[arg(long, env = "OPENROUTER_MODEL", default_value_t = default_model())]
    #[serde(default = "default_model")]
    pub model: String,

    /// Upstream API key
    #[arg(long, env = "OPENROUTER_API_KEY", default_value = "", hide_env_values = true)]
    #[serde(default)]
    pub api_key: String,

    /// SQLite database file; the platform data directory is used when unset
    #[arg(long, env = "DATABASE_PATH")]
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// Retries of a failed background job
    #[arg(long, env = "JOB_MAX_RETRIES", default_value_t = default_job_max_retries())]
    #[serde(default = "default_job_max_retries")]
    pub job_max_retries: u32,

    /// First backoff between background job attempts, in seconds
    #[arg(long, env = "JOB_RETRY_BACKOFF", default_value_t = default_job_retry_backoff_secs())]
    #[serde(default = "default_job_retry_backoff_secs")]
    pub job_retry_backoff_secs: u64,

    /// How long a finished job's status stays queryable, in seconds
    #[arg(long, env = "JOB_RESULT_RETENTION", default_value_t = default_job_retention_secs())]
    #[serde(default = "default_job_retention_secs")]
    pub job_retention_secs: u64,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", value_enum, default_value_t = LogLevel::Info)]
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        };
        f.write_str(name)
    }
}

/// Parser used to read [`Config`] from the environment alone
#[derive(Parser, Debug)]
struct EnvConfig {
    #[command(flatten)]
    config: Config,
}

fn default_l1_ttl_secs() -> u64 {
    300
}

fn default_chunk_ttl_secs() -> u64 {
    3600
}

fn default_cache_ttl_secs() -> u64 {
    3600
}

fn default_max_connections() -> usize {
    20
}

fn default_max_keepalive() -> usize {
    10
}

fn default_parallel_chunk_limit() -> usize {
    5
}

fn default_async_threshold() -> usize {
    3000
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_backoff_secs() -> u64 {
    2
}

fn default_max_backoff_secs() -> u64 {
    30
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_max_chars_per_request() -> usize {
    1500
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_job_max_retries() -> u32 {
    3
}

fn default_job_retry_backoff_secs() -> u64 {
    1
}

fn default_job_retention_secs() -> u64 {
    3600
}

impl Config {
    /// Read the configuration from environment variables, defaulting the rest
    pub fn from_env() -> Result<Self> {
        let parsed = EnvConfig::try_parse_from(["chunkwise"])
            .map_err(|e| anyhow!("Invalid configuration in environment: {}", e))?;
        Ok(parsed.config)
    }

    /// Read the configuration from a JSON file; absent fields take their defaults
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open config file: {}", path.display()))?;

        let reader = BufReader::new(file);
        serde_json::from_reader(reader)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        let endpoint = Url::parse(&self.endpoint)
            .with_context(|| format!("Invalid upstream endpoint: {}", self.endpoint))?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(anyhow!("Upstream endpoint must be http or https: {}", self.endpoint));
        }

        if let Some(cache_url) = &self.cache_url {
            let url = Url::parse(cache_url)
                .with_context(|| format!("Invalid cache URL: {}", cache_url))?;
            if !matches!(url.scheme(), "redis" | "rediss") {
                return Err(anyhow!("Cache URL must use the redis scheme: {}", cache_url));
            }
        }

        if self.parallel_chunk_limit == 0 {
            return Err(anyhow!("Parallel chunk limit must be at least 1"));
        }
        if self.max_connections == 0 {
            return Err(anyhow!("Upstream connection limit must be at least 1"));
        }
        if self.max_chars_per_request == 0 {
            return Err(anyhow!("Chunk size must be at least 1 character"));
        }
        if self.request_timeout_secs == 0 {
            return Err(anyhow!("Upstream timeout must be at least 1 second"));
        }

        Ok(())
    }

    pub fn cache_ttls(&self) -> CacheTtls {
        CacheTtls {
            local: Duration::from_secs(self.l1_ttl_secs),
            chunk: Duration::from_secs(self.chunk_ttl_secs),
            remote: Duration::from_secs(self.cache_ttl_secs),
        }
    }

    pub fn openrouter(&self) -> OpenRouterConfig {
        OpenRouterConfig {
            endpoint: self.endpoint.clone(),
            api_key: self.api_key.clone(),
            model: self.model.clone(),
            timeout: Duration::from_secs(self.request_timeout_secs),
            max_connections: self.max_connections,
            max_keepalive: self.max_keepalive,
            retry: RetryPolicy {
                max_retries: self.max_retries,
                initial_backoff: Duration::from_secs(self.retry_backoff_secs),
                max_backoff: Duration::from_secs(self.max_backoff_secs),
            },
        }
    }

    pub fn translation_options(&self) -> TranslationOptions {
        TranslationOptions {
            max_chars_per_chunk: self.max_chars_per_request,
            max_concurrent_requests: self.parallel_chunk_limit,
        }
    }

    pub fn job_retry(&self) -> JobRetryPolicy {
        JobRetryPolicy {
            max_retries: self.job_max_retries,
            backoff: Duration::from_secs(self.job_retry_backoff_secs),
        }
    }

    pub fn job_retention(&self) -> Duration {
        Duration::from_secs(self.job_retention_secs)
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            l1_ttl_secs: default_l1_ttl_secs(),
            chunk_ttl_secs: default_chunk_ttl_secs(),
            cache_ttl_secs: default_cache_ttl_secs(),
            cache_url: None,
            max_connections: default_max_connections(),
            max_keepalive: default_max_keepalive(),
            parallel_chunk_limit: default_parallel_chunk_limit(),
            async_threshold: default_async_threshold(),
            max_retries: default_max_retries(),
            retry_backoff_secs: default_retry_backoff_secs(),
            max_backoff_secs: default_max_backoff_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            max_chars_per_request: default_max_chars_per_request(),
            endpoint: default_endpoint(),
            model: default_model(),
            api_key: String::new(),
            database_path: None,
            job_max_retries: default_job_max_retries(),
            job_retry_backoff_secs: default_job_retry_backoff_secs(),
            job_retention_secs: default_job_retention_secs(),
            log_level: LogLevel::default(),
        }
    }
}
