use super::retry::RetryPolicy;
use crate::audio::AudioChunk;
use crate::error::JobError;
use crate::oracle::{OracleClient, OracleRequest};
use crate::queue::{ChunkJob, DeadLetter, JobQueue, PROCESS_CHUNK_TASK};
use crate::report::{merge, status_after};
use crate::store::VisitStore;
use crate::visit::VisitStatus;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// How a chunk job ended
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    /// Report and status were written
    Completed { attempts: u32, status: VisitStatus },
    /// Attempts exhausted or a non-transient failure; the visit is left `Failed...`
    DeadLettered { attempts: u32, reason: String },
}

/// What follows one attempt
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptStep {
    Done(JobOutcome),
    /// Transient failure; try again after this long
    RetryAfter(Duration),
}

/// Runs one chunk job to completion or failure, retrying transient failures
pub struct ChunkTaskExecutor {
    store: VisitStore,
    oracle: Arc<dyn OracleClient>,
    queue: Arc<dyn JobQueue>,
    policy: RetryPolicy,
}

impl ChunkTaskExecutor {
    pub fn new(
        store: VisitStore,
        oracle: Arc<dyn OracleClient>,
        queue: Arc<dyn JobQueue>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            store,
            oracle,
            queue,
            policy,
        }
    }

    /// Process `job`, retrying until it succeeds or the policy gives up.
    ///
    /// Failures never escape: they end as `Failed...` plus a dead letter.
    pub async fn execute(&self, job: &ChunkJob) -> JobOutcome {
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.attempt(job, attempt).await {
                AttemptStep::Done(outcome) => return outcome,
                AttemptStep::RetryAfter(delay) => tokio::time::sleep(delay).await,
            }
        }
    }

    /// Run attempt number `attempt` (1-based) of `job`.
    ///
    /// The caller owns the wait between attempts, so it can release whatever
    /// it holds while the job backs off.
    pub async fn attempt(&self, job: &ChunkJob, attempt: u32) -> AttemptStep {
        let max_attempts = self.policy.max_attempts();
        let started = Instant::now();

        info!(
            "Starting {} for visit {} chunk {} (attempt {}/{})",
            PROCESS_CHUNK_TASK, job.visit_id, job.chunk_number, attempt, max_attempts
        );

        let result = match tokio::time::timeout(self.policy.soft_time_limit, self.run_attempt(job))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(JobError::TimedOut {
                limit_secs: self.policy.soft_time_limit.as_secs_f64(),
            }),
        };

        let elapsed = started.elapsed().as_secs_f64();

        let err = match result {
            Ok(status) => {
                info!(
                    "Completed {} for visit {} chunk {} in {:.2}s (status: {})",
                    PROCESS_CHUNK_TASK, job.visit_id, job.chunk_number, elapsed, status
                );
                return AttemptStep::Done(JobOutcome::Completed {
                    attempts: attempt,
                    status,
                });
            }
            Err(err) => err,
        };

        error!(
            "Error in {} for visit {} chunk {} after {:.2}s (attempt {}/{}): {}",
            PROCESS_CHUNK_TASK,
            job.visit_id,
            job.chunk_number,
            elapsed,
            attempt,
            max_attempts,
            err
        );

        self.mark_failed(job).await;

        if !err.is_transient() || attempt >= max_attempts {
            return AttemptStep::Done(self.give_up(job, attempt, &err).await);
        }

        let delay = self.policy.delay_for(attempt);
        warn!(
            "Retrying visit {} chunk {} in {:.1}s",
            job.visit_id,
            job.chunk_number,
            delay.as_secs_f64()
        );

        AttemptStep::RetryAfter(delay)
    }

    /// One pass over the job: prior report, oracle, merge, write.
    async fn run_attempt(&self, job: &ChunkJob) -> Result<VisitStatus, JobError> {
        let prior = self.store.report(&job.visit_id).await?;
        let context_label = self
            .store
            .visit_type(&job.visit_id)
            .await?
            .unwrap_or_else(|| job.visit_id.clone());

        let audio = AudioChunk::load(&job.audio_ref).await?;

        let output = self
            .oracle
            .summarize(OracleRequest {
                context_label: &context_label,
                audio: &audio,
                prior_report: prior.as_ref(),
            })
            .await?;

        let outcome = merge(prior.as_ref(), &output)?;
        let status = status_after(job.chunk_number, job.is_final);

        if outcome.replaced_prior {
            debug!(
                "Replacing report of visit {} with chunk {} output",
                job.visit_id, job.chunk_number
            );
        }

        self.store
            .write_report(&job.visit_id, &outcome.report, &status)
            .await?;

        if job.is_final {
            info!(
                "Final report written for visit {} (chunk {})",
                job.visit_id, job.chunk_number
            );
        }

        Ok(status)
    }

    async fn mark_failed(&self, job: &ChunkJob) {
        if let Err(e) = self.store.set_status(&job.visit_id, &VisitStatus::Failed).await {
            error!(
                "Failed to mark visit {} as failed: {}",
                job.visit_id, e
            );
        }
    }

    async fn give_up(&self, job: &ChunkJob, attempts: u32, err: &JobError) -> JobOutcome {
        let reason = err.to_string();

        error!(
            "Giving up on visit {} chunk {} after {} attempt(s) (transient={}): {}",
            job.visit_id,
            job.chunk_number,
            attempts,
            err.is_transient(),
            reason
        );

        let letter = DeadLetter::new(job.clone(), attempts, reason.clone());
        if let Err(e) = self.queue.dead_letter(&letter).await {
            error!(
                "Failed to dead-letter visit {} chunk {}: {:#}",
                job.visit_id, job.chunk_number, e
            );
        }

        JobOutcome::DeadLettered { attempts, reason }
    }
}
