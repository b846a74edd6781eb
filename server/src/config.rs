use anyhow::Context;
use forgelib::OrchestratorConfig;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Which reconstruction backend drives conversions.
#[derive(Clone, Debug)]
pub enum ReconBackend {
    /// Built-in placeholder generator; no external service required.
    Stub { delay: Duration },
    /// Remote reconstruction service at the given endpoint.
    Http { endpoint: String },
}

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub artifact_dir: PathBuf,
    /// Prefix for generated artifact URLs, e.g. a public hostname.
    /// Empty means relative URLs.
    pub public_base_url: String,
    pub max_upload_bytes: usize,
    pub backend: ReconBackend,
    pub orchestrator: OrchestratorConfig,
}

impl Config {
    /// Load from the environment, with `.env` support for development.
    pub fn load() -> anyhow::Result<Self> {
        let _ = dotenvy::dotenv();

        let backend = match env_or("RECON_BACKEND", "stub").as_str() {
            "stub" => ReconBackend::Stub {
                delay: Duration::from_millis(parse_env("STUB_DELAY_MS", 0)?),
            },
            "http" => ReconBackend::Http {
                endpoint: env::var("RECON_ENDPOINT")
                    .context("RECON_BACKEND=http requires RECON_ENDPOINT")?,
            },
            other => anyhow::bail!("unsupported RECON_BACKEND: {other}"),
        };

        let orchestrator = OrchestratorConfig {
            workers: parse_env("WORKERS", 2)?,
            max_queue_depth: parse_env("MAX_QUEUE_DEPTH", 32)?,
            retry_ceiling: parse_env("RETRY_CEILING", 3)?,
            retry_backoff: Duration::from_millis(parse_env("RETRY_BACKOFF_MS", 500)?),
            attempt_timeout: Duration::from_secs(parse_env("ATTEMPT_TIMEOUT_SECS", 120)?),
            retention_window: Duration::from_secs(parse_env("RETENTION_SECS", 3600)?),
            sweep_interval: Duration::from_secs(parse_env("SWEEP_INTERVAL_SECS", 60)?),
            message_capacity: parse_env("MESSAGE_CAPACITY", 64)?,
        };

        Ok(Self {
            port: parse_env("PORT", 5000)?,
            artifact_dir: PathBuf::from(env_or("ARTIFACT_DIR", "artifacts")),
            public_base_url: env_or("PUBLIC_BASE_URL", ""),
            max_upload_bytes: parse_env("MAX_UPLOAD_BYTES", 8 * 1024 * 1024)?,
            backend,
            orchestrator,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .with_context(|| format!("{key} has an invalid value")),
        Err(_) => Ok(default),
    }
}
