//! Work queue carrying chunk jobs from the coordinator to workers
//!
//! - `MemoryJobQueue`: in-process channel, for single-process runs and tests
//! - `NatsJobQueue`: NATS JetStream stream with a durable pull consumer,
//!   giving at-least-once delivery across worker processes
//!
//! A job is acknowledged only after the worker has finished with it, either
//! by completing it or by moving it to the dead-letter channel.

pub mod memory;
pub mod messages;
pub mod nats;

pub use memory::MemoryJobQueue;
pub use messages::{ChunkJob, DeadLetter, PROCESS_CHUNK_TASK};
pub use nats::NatsJobQueue;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// A job handed to a worker, acknowledged once the worker is done with it
pub struct Delivery {
    pub job: ChunkJob,
    acker: Option<async_nats::jetstream::Message>,
}

impl Delivery {
    /// Delivery that needs no broker acknowledgement
    pub fn unacked(job: ChunkJob) -> Self {
        Self { job, acker: None }
    }

    pub(crate) fn jetstream(job: ChunkJob, message: async_nats::jetstream::Message) -> Self {
        Self {
            job,
            acker: Some(message),
        }
    }

    /// Tell the broker the job is still being worked on, restarting its ack timer
    pub async fn in_progress(&self) -> Result<()> {
        if let Some(message) = &self.acker {
            message
                .ack_with(async_nats::jetstream::AckKind::Progress)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to extend chunk job: {}", e))?;
        }
        Ok(())
    }

    /// Tell the broker the job must not be redelivered
    pub async fn ack(self) -> Result<()> {
        if let Some(message) = self.acker {
            message
                .ack()
                .await
                .map_err(|e| anyhow::anyhow!("Failed to ack chunk job: {}", e))?;
        }
        Ok(())
    }
}

/// Durable queue of chunk jobs
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Publish a job; returns once the broker has accepted it
    async fn enqueue(&self, job: &ChunkJob) -> Result<()>;

    /// Publish a job that exhausted its attempts
    async fn dead_letter(&self, letter: &DeadLetter) -> Result<()>;

    /// Start consuming jobs
    ///
    /// Returns a channel receiver that will receive deliveries
    async fn consume(&self) -> Result<mpsc::Receiver<Delivery>>;

    /// Queue name for logging
    fn name(&self) -> &str;
}
