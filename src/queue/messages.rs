use serde::{Deserialize, Serialize};

/// Name the chunk job is published under
pub const PROCESS_CHUNK_TASK: &str = "process_chunk";

/// Chunk job published to the work queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkJob {
    pub visit_id: String,
    /// Caller-supplied, 1-based; not checked for order or gaps
    pub chunk_number: u32,
    /// Path of the stored audio payload
    pub audio_ref: String,
    #[serde(default)]
    pub is_final: bool,
    /// RFC3339 timestamp
    pub enqueued_at: String,
}

impl ChunkJob {
    pub fn new(visit_id: &str, chunk_number: u32, audio_ref: &str, is_final: bool) -> Self {
        Self {
            visit_id: visit_id.to_string(),
            chunk_number,
            audio_ref: audio_ref.to_string(),
            is_final,
            enqueued_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Job that exhausted its attempts, published to the dead-letter channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadLetter {
    pub task: String,
    pub job: ChunkJob,
    pub attempts: u32,
    pub reason: String,
    /// RFC3339 timestamp
    pub failed_at: String,
}

impl DeadLetter {
    pub fn new(job: ChunkJob, attempts: u32, reason: impl Into<String>) -> Self {
        Self {
            task: PROCESS_CHUNK_TASK.to_string(),
            job,
            attempts,
            reason: reason.into(),
            failed_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}
