use super::AudioError;
use std::path::PathBuf;
use tracing::info;

/// Writes uploaded chunk payloads to the upload directory
///
/// Every upload gets its own file, so a queued job's `audio_ref` keeps
/// pointing at the bytes it was submitted with.
#[derive(Debug, Clone)]
pub struct ChunkStorage {
    upload_dir: PathBuf,
}

impl ChunkStorage {
    pub fn new(upload_dir: impl Into<PathBuf>) -> Result<Self, AudioError> {
        let upload_dir = upload_dir.into();
        std::fs::create_dir_all(&upload_dir)?;

        info!("Chunk storage initialized at {}", upload_dir.display());

        Ok(Self { upload_dir })
    }

    pub fn upload_dir(&self) -> &PathBuf {
        &self.upload_dir
    }

    /// Path of one upload of a visit's chunk.
    pub fn chunk_path(
        &self,
        visit_id: &str,
        chunk_number: u32,
        upload_id: &str,
        extension: &str,
    ) -> PathBuf {
        self.upload_dir.join(format!(
            "{}-chunk-{:03}-{}.{}",
            visit_id, chunk_number, upload_id, extension
        ))
    }

    /// Persist one chunk's bytes under a fresh name and return its path.
    pub async fn save(
        &self,
        visit_id: &str,
        chunk_number: u32,
        extension: &str,
        bytes: &[u8],
    ) -> Result<PathBuf, AudioError> {
        if bytes.is_empty() {
            return Err(AudioError::Empty {
                path: format!("upload of chunk {} for visit {}", chunk_number, visit_id),
            });
        }

        let upload_id = uuid::Uuid::new_v4().simple().to_string();
        let path = self.chunk_path(visit_id, chunk_number, &upload_id, extension);

        // Write then rename so a worker never reads a half-written chunk
        let tmp = path.with_extension(format!("{}.part", extension));
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;

        info!(
            "Stored chunk {} for visit {} ({} bytes) at {}",
            chunk_number,
            visit_id,
            bytes.len(),
            path.display()
        );

        Ok(path)
    }
}
