use super::{ChunkJob, DeadLetter, Delivery, JobQueue};
use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};
use tracing::{info, warn};

/// In-process job queue
///
/// Jobs live only as long as the process; there is a single consumer.
pub struct MemoryJobQueue {
    tx: mpsc::Sender<Delivery>,
    rx: Mutex<Option<mpsc::Receiver<Delivery>>>,
    dead_letters: Mutex<Vec<DeadLetter>>,
}

impl MemoryJobQueue {
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));

        Self {
            tx,
            rx: Mutex::new(Some(rx)),
            dead_letters: Mutex::new(Vec::new()),
        }
    }

    /// Jobs moved to the dead-letter channel so far
    pub async fn dead_letters(&self) -> Vec<DeadLetter> {
        self.dead_letters.lock().await.clone()
    }
}

#[async_trait]
impl JobQueue for MemoryJobQueue {
    async fn enqueue(&self, job: &ChunkJob) -> Result<()> {
        self.tx
            .send(Delivery::unacked(job.clone()))
            .await
            .context("In-memory job queue is closed")?;

        info!(
            "Enqueued chunk {} for visit {} (final={})",
            job.chunk_number, job.visit_id, job.is_final
        );

        Ok(())
    }

    async fn dead_letter(&self, letter: &DeadLetter) -> Result<()> {
        warn!(
            "Dead-lettered chunk {} for visit {} after {} attempts: {}",
            letter.job.chunk_number, letter.job.visit_id, letter.attempts, letter.reason
        );
        self.dead_letters.lock().await.push(letter.clone());
        Ok(())
    }

    async fn consume(&self) -> Result<mpsc::Receiver<Delivery>> {
        self.rx
            .lock()
            .await
            .take()
            .context("In-memory job queue already has a consumer")
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_enqueue_then_consume() -> Result<()> {
        let queue = MemoryJobQueue::new(8);
        queue.enqueue(&ChunkJob::new("v1", 1, "/tmp/a.wav", false)).await?;

        let mut rx = queue.consume().await?;
        let delivery = rx.recv().await.context("no delivery")?;
        assert_eq!(delivery.job.visit_id, "v1");
        assert_eq!(delivery.job.chunk_number, 1);
        delivery.ack().await?;

        Ok(())
    }

    #[tokio::test]
    async fn test_single_consumer() -> Result<()> {
        let queue = MemoryJobQueue::new(8);
        let _rx = queue.consume().await?;
        assert!(queue.consume().await.is_err());
        Ok(())
    }
}
