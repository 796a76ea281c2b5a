use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

const ENV_PREFIX: &str = "VISIT_SCRIBE";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub store: StoreConfig,
    pub queue: QueueConfig,
    pub oracle: OracleConfig,
    pub worker: WorkerConfig,
    pub uploads: UploadConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "visit-scribe".to_string(),
            http: HttpConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
    /// Answer report lookups with 400 until the visit is completed
    pub report_requires_completion: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 8000,
            report_requires_completion: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    Redis,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub redis_url: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            redis_url: "redis://localhost:6379/1".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueBackend {
    #[default]
    Memory,
    Nats,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    pub backend: QueueBackend,
    pub nats_url: String,
    /// JetStream stream holding chunk jobs
    pub stream: String,
    pub subject: String,
    /// Durable consumer shared by all workers
    pub consumer: String,
    /// How long a delivered job may run before JetStream redelivers it
    pub ack_wait_secs: u64,
    /// Buffer size of the in-memory queue
    pub capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            backend: QueueBackend::Memory,
            nats_url: "nats://localhost:4222".to_string(),
            stream: "VISIT_JOBS".to_string(),
            subject: "jobs.process_chunk".to_string(),
            consumer: "chunk-workers".to_string(),
            ack_wait_secs: 3600,
            capacity: 100,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub request_timeout_secs: u64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            model: "gemini-2.0-flash".to_string(),
            api_key: None,
            request_timeout_secs: 240,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Jobs executed at the same time by one worker process
    pub concurrency: usize,
    /// Retries after the first attempt
    pub max_retries: u32,
    pub base_delay_secs: u64,
    pub max_delay_secs: u64,
    /// Soft ceiling on a single attempt
    pub soft_time_limit_secs: u64,
    pub jitter: bool,
    /// Run at most one job per visit at a time within this process
    pub serialize_per_visit: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            max_retries: 3,
            base_delay_secs: 60,
            max_delay_secs: 600,
            soft_time_limit_secs: 300,
            jitter: true,
            serialize_per_visit: true,
        }
    }
}

impl WorkerConfig {
    pub fn soft_time_limit(&self) -> Duration {
        Duration::from_secs(self.soft_time_limit_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub dir: String,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            dir: "uploads".to_string(),
        }
    }
}

impl UploadConfig {
    /// Upload directory with `~` and environment variables expanded
    pub fn resolved_dir(&self) -> Result<PathBuf> {
        let expanded = shellexpand::full(&self.dir)
            .with_context(|| format!("Failed to expand upload dir {}", self.dir))?;
        Ok(PathBuf::from(expanded.as_ref()))
    }
}

impl Config {
    /// Load from `path` (any extension `config` understands), then apply
    /// `VISIT_SCRIBE__SECTION__KEY` environment overrides.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()
            .with_context(|| format!("Failed to load config from {}", path))?;

        Ok(settings.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_retry_contract() {
        let cfg = Config::default();
        assert_eq!(cfg.worker.max_retries, 3);
        assert_eq!(cfg.worker.base_delay_secs, 60);
        assert_eq!(cfg.worker.soft_time_limit(), Duration::from_secs(300));
        assert_eq!(cfg.queue.subject, "jobs.process_chunk");
        assert!(!cfg.service.http.report_requires_completion);
    }

    #[test]
    fn test_load_partial_file() -> Result<()> {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile()?;
        writeln!(
            file,
            "[store]\nbackend = \"redis\"\n\n[worker]\nconcurrency = 8\n"
        )?;

        file.flush()?;

        // File::with_name resolves the extension itself
        let path = file.path().with_extension("");
        let cfg = Config::load(path.to_str().unwrap_or_default())?;
        assert_eq!(cfg.store.backend, StoreBackend::Redis);
        assert_eq!(cfg.worker.concurrency, 8);
        assert_eq!(cfg.worker.max_retries, 3);
        assert_eq!(cfg.queue.backend, QueueBackend::Memory);

        Ok(())
    }
}
