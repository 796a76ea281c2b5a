pub mod file;
pub mod storage;

pub use file::{probe_wav, upload_extension, AudioChunk, WavInfo};
pub use storage::ChunkStorage;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AudioError {
    #[error("audio file not found: {path}")]
    NotFound { path: String },

    #[error("audio payload is empty: {path}")]
    Empty { path: String },

    #[error("audio I/O error: {0}")]
    Io(#[from] std::io::Error),
}
