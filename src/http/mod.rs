//! HTTP front door for the visit pipeline
//!
//! This module provides a REST API over `PipelineCoordinator`:
//! - POST /create-visit?visit_type=... - Create a visit
//! - POST /upload-chunk/:id?chunk_number=N&is_final=bool - Upload an audio chunk
//! - POST /visits/:id/reopen - Reopen a completed visit
//! - GET /status/:id - Query visit status
//! - GET /report/:id - Get the report accumulated so far
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use handlers::{
    CreateVisitResponse, ErrorResponse, ReportResponse, StatusResponse, UploadChunkResponse,
};
pub use routes::create_router;
pub use state::AppState;
