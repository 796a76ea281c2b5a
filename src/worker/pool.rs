use super::executor::{AttemptStep, ChunkTaskExecutor, JobOutcome};
use crate::queue::Delivery;
use anyhow::Result;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Jobs held per worker slot, running or waiting behind their visit
const BUFFER_PER_WORKER: usize = 4;

/// How often waiting jobs tell the broker they are still owned
const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(60);

/// Consumes deliveries and runs chunk jobs with bounded concurrency
///
/// A worker slot is held only while an attempt runs, not while a job waits
/// for its visit or backs off before a retry. With per-visit serialization,
/// a visit's jobs run one after another in delivery order, so each chunk sees
/// the report left by the chunks before it; other visits keep running.
pub struct WorkerPool {
    executor: Arc<ChunkTaskExecutor>,
    concurrency: usize,
    serialize_per_visit: bool,
}

impl WorkerPool {
    pub fn new(executor: Arc<ChunkTaskExecutor>, concurrency: usize, serialize_per_visit: bool) -> Self {
        Self {
            executor,
            concurrency: concurrency.max(1),
            serialize_per_visit,
        }
    }

    /// Run until the delivery channel closes, then wait for in-flight jobs.
    pub async fn run(&self, mut deliveries: mpsc::Receiver<Delivery>) -> Result<()> {
        info!(
            "Worker pool started (concurrency={}, serialize_per_visit={})",
            self.concurrency, self.serialize_per_visit
        );

        let slots = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks: JoinSet<String> = JoinSet::new();
        // Visits with a job in flight, mapped to their jobs waiting behind it
        let mut waiting: HashMap<String, VecDeque<Delivery>> = HashMap::new();
        let mut buffered = 0usize;
        let max_held = self.concurrency * BUFFER_PER_WORKER;
        let mut open = true;

        let mut keepalive = tokio::time::interval(KEEPALIVE_INTERVAL);
        keepalive.tick().await;

        while open || !tasks.is_empty() {
            tokio::select! {
                next = deliveries.recv(), if open && tasks.len() + buffered < max_held => {
                    match next {
                        Some(delivery) => {
                            let visit_id = delivery.job.visit_id.clone();
                            match waiting.get_mut(&visit_id) {
                                Some(queue) => {
                                    debug!(
                                        "Visit {} busy; chunk {} waits ({} queued)",
                                        visit_id,
                                        delivery.job.chunk_number,
                                        queue.len() + 1
                                    );
                                    queue.push_back(delivery);
                                    buffered += 1;
                                }
                                None => {
                                    if self.serialize_per_visit {
                                        waiting.insert(visit_id, VecDeque::new());
                                    }
                                    self.spawn(&mut tasks, &slots, delivery);
                                }
                            }
                        }
                        None => open = false,
                    }
                }
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    let visit_id = match joined {
                        Ok(visit_id) => visit_id,
                        Err(e) => {
                            error!("Chunk job task failed: {}", e);
                            continue;
                        }
                    };

                    if !self.serialize_per_visit {
                        continue;
                    }

                    match waiting.get_mut(&visit_id).and_then(|q| q.pop_front()) {
                        Some(next) => {
                            buffered -= 1;
                            self.spawn(&mut tasks, &slots, next);
                        }
                        None => {
                            waiting.remove(&visit_id);
                        }
                    }
                }
                _ = keepalive.tick(), if buffered > 0 => {
                    for delivery in waiting.values().flatten() {
                        if let Err(e) = delivery.in_progress().await {
                            warn!(
                                "Failed to extend visit {} chunk {}: {:#}",
                                delivery.job.visit_id, delivery.job.chunk_number, e
                            );
                        }
                    }
                }
            }
        }

        info!("Worker pool stopped");

        Ok(())
    }

    fn spawn(&self, tasks: &mut JoinSet<String>, slots: &Arc<Semaphore>, delivery: Delivery) {
        let executor = Arc::clone(&self.executor);
        let slots = Arc::clone(slots);

        tasks.spawn(async move {
            let visit_id = delivery.job.visit_id.clone();
            let chunk_number = delivery.job.chunk_number;

            // A panicking job must still hand its visit to the next chunk
            if let Err(e) = tokio::spawn(run_delivery(executor, slots, delivery)).await {
                error!(
                    "Chunk job for visit {} chunk {} panicked: {}",
                    visit_id, chunk_number, e
                );
            }

            visit_id
        });
    }
}

async fn run_delivery(executor: Arc<ChunkTaskExecutor>, slots: Arc<Semaphore>, delivery: Delivery) {
    let job = &delivery.job;
    let mut attempt = 0;

    let outcome = loop {
        attempt += 1;

        if let Err(e) = delivery.in_progress().await {
            warn!(
                "Failed to extend visit {} chunk {}: {:#}",
                job.visit_id, job.chunk_number, e
            );
        }

        let step = {
            let _slot = match slots.acquire().await {
                Ok(slot) => slot,
                Err(_) => {
                    error!(
                        "Worker slots closed; dropping visit {} chunk {}",
                        job.visit_id, job.chunk_number
                    );
                    return;
                }
            };
            executor.attempt(job, attempt).await
        };

        match step {
            AttemptStep::Done(outcome) => break outcome,
            AttemptStep::RetryAfter(delay) => tokio::time::sleep(delay).await,
        }
    };

    if let JobOutcome::DeadLettered { attempts, .. } = &outcome {
        info!(
            "Visit {} chunk {} left failed after {} attempt(s)",
            job.visit_id, job.chunk_number, attempts
        );
    }

    let visit_id = job.visit_id.clone();
    let chunk_number = job.chunk_number;

    if let Err(e) = delivery.ack().await {
        error!(
            "Failed to ack visit {} chunk {}: {:#}",
            visit_id, chunk_number, e
        );
    }
}
