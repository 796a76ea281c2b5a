pub mod audio;
pub mod config;
pub mod error;
pub mod http;
pub mod oracle;
pub mod pipeline;
pub mod queue;
pub mod report;
pub mod store;
pub mod visit;
pub mod worker;

pub use audio::{AudioChunk, ChunkStorage};
pub use config::Config;
pub use error::{JobError, PipelineError};
pub use http::{create_router, AppState};
pub use oracle::{GeminiOracle, OracleClient, OracleError, OracleRequest};
pub use pipeline::PipelineCoordinator;
pub use queue::{ChunkJob, JobQueue, MemoryJobQueue, NatsJobQueue};
pub use report::{NoteSection, Report, SoapNote};
pub use store::{MemoryStore, RecordStore, RedisStore, VisitStore};
pub use visit::{Visit, VisitStatus};
pub use worker::{AttemptStep, ChunkTaskExecutor, JobOutcome, RetryPolicy, WorkerPool};
