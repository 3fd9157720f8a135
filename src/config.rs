//! Service configuration, loaded from the environment.

use std::time::Duration;

use anyhow::{bail, Result};

/// Runtime configuration. Every knob has a default; only the three
/// credentials are required.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,

    /// Pathstore connection.
    pub pathstore_url: String,
    pub pathstore_api_key: String,

    /// Key callers present on the ingest API.
    pub docgest_api_key: String,

    /// Claude extraction.
    pub anthropic_api_key: String,
    pub anthropic_model: String,

    /// Worker pool.
    pub worker_count: usize,
    pub max_queue_size: usize,
    pub max_concurrent_extract: usize,
    pub max_concurrent_store: usize,

    /// Upload limits.
    pub max_upload_bytes: usize,

    /// Chunking defaults.
    pub default_chunk_size: usize,
    pub default_chunk_overlap: usize,

    /// How long finished jobs stay visible in the registry.
    pub job_ttl: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            port: env_parse("PORT", 8090),

            pathstore_url: env_or("PATHSTORE_URL", "http://localhost:8080"),
            pathstore_api_key: env_or("PATHSTORE_API_KEY", ""),

            docgest_api_key: env_or("DOCGEST_API_KEY", ""),

            anthropic_api_key: env_or("ANTHROPIC_API_KEY", ""),
            anthropic_model: env_or("ANTHROPIC_MODEL", "claude-sonnet-4-5-20250929"),

            worker_count: env_parse_nonzero("WORKER_COUNT", 4) as usize,
            max_queue_size: env_parse_nonzero("MAX_QUEUE_SIZE", 100) as usize,
            max_concurrent_extract: env_parse_nonzero("MAX_CONCURRENT_EXTRACT", 5) as usize,
            max_concurrent_store: env_parse_nonzero("MAX_CONCURRENT_STORE", 10) as usize,

            max_upload_bytes: env_parse_nonzero("MAX_UPLOAD_BYTES", 50 * 1024 * 1024) as usize,

            default_chunk_size: env_parse_nonzero("DEFAULT_CHUNK_SIZE", 1500) as usize,
            default_chunk_overlap: env_parse_nonzero("DEFAULT_CHUNK_OVERLAP", 200) as usize,

            job_ttl: Duration::from_secs(env_parse_nonzero("JOB_TTL_SECS", 3600)),
        }
    }

    /// Checks that the required secrets are present.
    pub fn validate(&self) -> Result<()> {
        if self.pathstore_api_key.is_empty() {
            bail!("PATHSTORE_API_KEY is required");
        }
        if self.docgest_api_key.is_empty() {
            bail!("DOCGEST_API_KEY is required");
        }
        if self.anthropic_api_key.is_empty() {
            bail!("ANTHROPIC_API_KEY is required");
        }
        Ok(())
    }
}

fn env_or(key: &str, fallback: &str) -> String {
    match std::env::var(key) {
        Ok(v) if !v.is_empty() => v,
        _ => fallback.to_string(),
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, fallback: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(fallback)
}

/// Like [`env_parse`] but zero falls back too; none of these knobs can
/// meaningfully be zero.
fn env_parse_nonzero(key: &str, fallback: u64) -> u64 {
    match std::env::var(key).ok().and_then(|v| v.parse::<u64>().ok()) {
        Some(n) if n > 0 => n,
        _ => fallback,
    }
}
