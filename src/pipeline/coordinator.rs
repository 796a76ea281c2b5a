use crate::audio::ChunkStorage;
use crate::error::{PipelineError, Result};
use crate::queue::{ChunkJob, JobQueue};
use crate::report::Report;
use crate::store::VisitStore;
use crate::visit::VisitStatus;
use std::sync::Arc;
use tracing::{info, warn};

/// Entry point for creating visits, submitting chunks and reading progress
///
/// Every front door goes through this one type.
#[derive(Clone)]
pub struct PipelineCoordinator {
    store: VisitStore,
    queue: Arc<dyn JobQueue>,
    storage: ChunkStorage,
}

impl PipelineCoordinator {
    pub fn new(store: VisitStore, queue: Arc<dyn JobQueue>, storage: ChunkStorage) -> Self {
        Self {
            store,
            queue,
            storage,
        }
    }

    /// Create a visit with status `created` and return its new id.
    pub async fn create_visit(&self, visit_type: &str) -> Result<String> {
        let visit_id = uuid::Uuid::new_v4().to_string();
        self.store.create(&visit_id, visit_type).await?;

        info!("Created visit {} (type: {})", visit_id, visit_type);

        Ok(visit_id)
    }

    /// Mark the visit as processing `chunk_number` and enqueue its job.
    ///
    /// Returns once the job is accepted by the queue, not once it has run.
    pub async fn submit_chunk(
        &self,
        visit_id: &str,
        chunk_number: u32,
        audio_ref: &str,
        is_final: bool,
    ) -> Result<()> {
        let next = self.check_accepts_chunk(visit_id, chunk_number).await?;

        self.store.set_status(visit_id, &next).await?;

        let job = ChunkJob::new(visit_id, chunk_number, audio_ref, is_final);
        self.queue.enqueue(&job).await.map_err(PipelineError::Queue)?;

        info!(
            "Submitted chunk {} for visit {} via {} queue (final={})",
            chunk_number,
            visit_id,
            self.queue.name(),
            is_final
        );

        Ok(())
    }

    /// Store an uploaded chunk payload, then submit it.
    ///
    /// `extension` names the payload format (`wav`, `mp3`, ...). Nothing is
    /// written for a visit that would reject the chunk.
    pub async fn upload_chunk(
        &self,
        visit_id: &str,
        chunk_number: u32,
        audio: &[u8],
        extension: &str,
        is_final: bool,
    ) -> Result<()> {
        self.check_accepts_chunk(visit_id, chunk_number).await?;

        let path = self
            .storage
            .save(visit_id, chunk_number, extension, audio)
            .await?;
        self.submit_chunk(visit_id, chunk_number, &path.to_string_lossy(), is_final)
            .await
    }

    pub async fn get_status(&self, visit_id: &str) -> Result<VisitStatus> {
        self.require_status(visit_id).await
    }

    /// Whatever report is stored, complete or not.
    pub async fn get_report(&self, visit_id: &str) -> Result<Option<Report>> {
        self.require_status(visit_id).await?;
        Ok(self.store.report(visit_id).await?)
    }

    /// Allow further chunks on a completed visit.
    pub async fn reopen_visit(&self, visit_id: &str) -> Result<VisitStatus> {
        let current = self.require_status(visit_id).await?;
        let next = VisitStatus::Reopened;

        if !current.can_transition_to(&next) {
            return Err(PipelineError::InvalidTransition {
                from: current,
                to: next,
            });
        }

        self.store.set_status(visit_id, &next).await?;
        info!("Reopened visit {}", visit_id);

        Ok(next)
    }

    /// Status the visit moves to when `chunk_number` is accepted.
    async fn check_accepts_chunk(&self, visit_id: &str, chunk_number: u32) -> Result<VisitStatus> {
        let current = self.require_status(visit_id).await?;
        let next = VisitStatus::Processing { chunk_number };

        if current.can_transition_to(&next) {
            return Ok(next);
        }

        warn!(
            "Rejecting chunk {} for visit {} in status '{}'",
            chunk_number, visit_id, current
        );

        Err(match current {
            VisitStatus::Completed => PipelineError::VisitClosed {
                visit_id: visit_id.to_string(),
            },
            from => PipelineError::InvalidTransition { from, to: next },
        })
    }

    async fn require_status(&self, visit_id: &str) -> Result<VisitStatus> {
        self.store
            .status(visit_id)
            .await?
            .ok_or_else(|| PipelineError::NotFound {
                visit_id: visit_id.to_string(),
            })
    }
}
