// Shared fixtures for integration tests: a scripted oracle, report JSON
// builders, WAV payloads and an in-memory pipeline.

#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc;
use visit_scribe::queue::Delivery;
use visit_scribe::{
    ChunkStorage, ChunkTaskExecutor, JobOutcome, MemoryJobQueue, MemoryStore, OracleClient,
    OracleError, OracleRequest, PipelineCoordinator, RetryPolicy, VisitStore,
};

/// What the scripted oracle does on one call
#[derive(Debug, Clone)]
pub enum Reply {
    Report(String),
    Upstream(u16),
    Slow(Duration, String),
}

/// What the scripted oracle was asked
#[derive(Debug, Clone)]
pub struct OracleCall {
    pub context_label: String,
    pub prior_summary: Option<String>,
    pub audio_bytes: usize,
}

pub struct ScriptedOracle {
    replies: Mutex<VecDeque<Reply>>,
    fallback: Reply,
    calls: Mutex<Vec<OracleCall>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl ScriptedOracle {
    /// Replies in order, then `fallback` forever
    pub fn new(replies: Vec<Reply>, fallback: Reply) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            fallback,
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn always(reply: Reply) -> Self {
        Self::new(Vec::new(), reply)
    }

    pub fn calls(&self) -> Vec<OracleCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Most calls that were ever running at the same time
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OracleClient for ScriptedOracle {
    async fn summarize(&self, request: OracleRequest<'_>) -> Result<String, OracleError> {
        self.calls.lock().unwrap().push(OracleCall {
            context_label: request.context_label.to_string(),
            prior_summary: request.prior_report.map(|r| r.detailed_summary.clone()),
            audio_bytes: request.audio.bytes.len(),
        });

        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(running, Ordering::SeqCst);

        let result = match reply {
            Reply::Report(json) => Ok(json),
            Reply::Upstream(status) => Err(OracleError::Upstream {
                status,
                body: "scripted failure".to_string(),
            }),
            Reply::Slow(delay, json) => {
                tokio::time::sleep(delay).await;
                Ok(json)
            }
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Oracle output for a report whose plan is `plan`
pub fn report_json(summary: &str, plan: &str) -> String {
    serde_json::json!({
        "detailed_summary": summary,
        "SOAP_note_so_far": {
            "Subjective": { "parameter": "Chest pain on exertion", "evidence": ["it hurts when I climb stairs"] },
            "Objective": { "parameter": "BP 142/91", "evidence": ["your blood pressure is one forty two over ninety one"] },
            "Assessment": { "parameter": "Suspected stable angina", "evidence": [] },
            "Plan": { "parameter": plan, "evidence": [] }
        }
    })
    .to_string()
}

/// A short 16kHz mono WAV payload
pub fn wav_bytes(seconds: f64) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 16000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut buf = Vec::new();
    {
        let mut writer = hound::WavWriter::new(Cursor::new(&mut buf), spec)?;
        let samples = (seconds * 16000.0) as usize;
        for i in 0..samples {
            writer.write_sample(((i % 100) as i16) * 100)?;
        }
        writer.finalize()?;
    }

    Ok(buf)
}

/// Retry policy with millisecond delays
pub fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        max_retries: 3,
        base_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
        jitter: true,
        soft_time_limit: Duration::from_secs(5),
    }
}

/// In-memory pipeline wired the way `main` wires the real one
pub struct Harness {
    pub coordinator: PipelineCoordinator,
    pub store: VisitStore,
    pub queue: Arc<MemoryJobQueue>,
    pub oracle: Arc<ScriptedOracle>,
    pub executor: Arc<ChunkTaskExecutor>,
    pub deliveries: mpsc::Receiver<Delivery>,
    pub upload_dir: TempDir,
}

impl Harness {
    pub async fn new(oracle: ScriptedOracle) -> Result<Self> {
        Self::with_policy(oracle, fast_policy()).await
    }

    pub async fn with_policy(oracle: ScriptedOracle, policy: RetryPolicy) -> Result<Self> {
        use visit_scribe::JobQueue;

        let upload_dir = TempDir::new()?;
        let store = VisitStore::new(Arc::new(MemoryStore::new()));
        let queue = Arc::new(MemoryJobQueue::new(64));
        let oracle = Arc::new(oracle);

        let executor = Arc::new(ChunkTaskExecutor::new(
            store.clone(),
            oracle.clone(),
            queue.clone(),
            policy,
        ));

        let coordinator = PipelineCoordinator::new(
            store.clone(),
            queue.clone(),
            ChunkStorage::new(upload_dir.path())?,
        );

        let deliveries = queue.consume().await?;

        Ok(Self {
            coordinator,
            store,
            queue,
            oracle,
            executor,
            deliveries,
            upload_dir,
        })
    }

    /// Upload a small WAV chunk through the coordinator
    pub async fn upload(&self, visit_id: &str, chunk_number: u32, is_final: bool) -> Result<()> {
        self.coordinator
            .upload_chunk(visit_id, chunk_number, &wav_bytes(0.25)?, "wav", is_final)
            .await?;
        Ok(())
    }

    /// Execute the next queued job, as a worker would
    pub async fn run_next(&mut self) -> Result<JobOutcome> {
        let delivery = self
            .deliveries
            .try_recv()
            .map_err(|e| anyhow::anyhow!("no queued job: {}", e))?;
        let outcome = self.executor.execute(&delivery.job).await;
        delivery.ack().await?;
        Ok(outcome)
    }
}
