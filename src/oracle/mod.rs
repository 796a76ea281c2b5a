//! Client side of the external summarization oracle
//!
//! The oracle turns an audio chunk plus the report built so far into an
//! updated report. Output is returned raw; validation belongs to the merge
//! engine.

mod gemini;
pub mod prompt;

pub use gemini::GeminiOracle;

use crate::audio::AudioChunk;
use crate::report::Report;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OracleError {
    #[error("oracle transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("oracle returned HTTP {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("oracle response carried no report: {0}")]
    EmptyResponse(String),

    #[error("oracle misconfigured: {0}")]
    Config(String),
}

impl OracleError {
    /// Transport failures, throttling and server-side errors are worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            OracleError::Transport(_) => true,
            OracleError::Upstream { status, .. } => {
                *status == 408 || *status == 429 || *status >= 500
            }
            OracleError::EmptyResponse(_) => true,
            OracleError::Config(_) => false,
        }
    }
}

/// One oracle invocation
#[derive(Debug, Clone, Copy)]
pub struct OracleRequest<'a> {
    /// Visit type, or the visit id when no type is recorded
    pub context_label: &'a str,
    pub audio: &'a AudioChunk,
    pub prior_report: Option<&'a Report>,
}

/// External summarization capability
#[async_trait]
pub trait OracleClient: Send + Sync {
    /// Produce the updated report for one chunk, as raw JSON text
    async fn summarize(&self, request: OracleRequest<'_>) -> Result<String, OracleError>;

    /// Oracle name for logging
    fn name(&self) -> &str;
}
