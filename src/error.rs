//! Error types for the visit pipeline.

use crate::audio::AudioError;
use crate::oracle::OracleError;
use crate::report::MergeError;
use crate::store::StoreError;
use crate::visit::VisitStatus;
use thiserror::Error;

/// Errors surfaced synchronously by the pipeline coordinator.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Visit {visit_id} not found")]
    NotFound { visit_id: String },

    #[error("Visit {visit_id} is completed; reopen it before submitting more chunks")]
    VisitClosed { visit_id: String },

    #[error("Invalid status transition from '{from}' to '{to}'")]
    InvalidTransition { from: VisitStatus, to: VisitStatus },

    #[error("Record store error: {0}")]
    Store(#[from] StoreError),

    #[error("Job queue error: {0}")]
    Queue(#[source] anyhow::Error),

    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors raised by a single chunk job attempt.
#[derive(Error, Debug)]
pub enum JobError {
    #[error("Oracle failure: {0}")]
    Oracle(#[from] OracleError),

    #[error("Malformed oracle output: {0}")]
    Malformed(#[from] MergeError),

    #[error("Record store failure: {0}")]
    Store(#[from] StoreError),

    #[error("Audio unavailable: {0}")]
    Audio(#[from] AudioError),

    #[error("Attempt exceeded soft time limit of {limit_secs:.1}s")]
    TimedOut { limit_secs: f64 },
}

impl JobError {
    /// Whether a later attempt could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            JobError::Oracle(e) => e.is_transient(),
            JobError::Malformed(_) => true,
            JobError::Store(_) => true,
            JobError::Audio(_) => false,
            JobError::TimedOut { .. } => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let error = PipelineError::NotFound {
            visit_id: "abc".to_string(),
        };
        assert_eq!(error.to_string(), "Visit abc not found");
    }

    #[test]
    fn test_job_error_classification() {
        assert!(JobError::TimedOut { limit_secs: 300.0 }.is_transient());
        assert!(JobError::Store(StoreError::Unavailable("down".into())).is_transient());
        assert!(!JobError::Audio(AudioError::NotFound {
            path: "/tmp/missing.wav".into()
        })
        .is_transient());
        assert!(JobError::Malformed(MergeError::BlankParameter { section: "Plan" }).is_transient());
    }
}
