use super::state::AppState;
use crate::audio::{upload_extension, AudioError};
use crate::error::PipelineError;
use crate::report::Report;
use crate::visit::VisitStatus;
use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

/// Multipart field carrying the audio payload
const CHUNK_FIELD: &str = "chunk";

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateVisitParams {
    pub visit_type: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateVisitResponse {
    pub visit_id: String,
}

#[derive(Debug, Deserialize)]
pub struct UploadChunkParams {
    pub chunk_number: u32,

    #[serde(default)]
    pub is_final: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadChunkResponse {
    pub detail: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub visit_id: String,
    pub status: VisitStatus,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReportResponse {
    pub visit_id: String,
    pub report: Option<Report>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

fn pipeline_error(err: PipelineError) -> Response {
    let status = match &err {
        PipelineError::NotFound { .. } => StatusCode::NOT_FOUND,
        PipelineError::VisitClosed { .. } | PipelineError::InvalidTransition { .. } => {
            StatusCode::CONFLICT
        }
        PipelineError::Store(_) | PipelineError::Queue(_) => StatusCode::SERVICE_UNAVAILABLE,
        PipelineError::Audio(AudioError::Empty { .. } | AudioError::NotFound { .. }) => {
            StatusCode::BAD_REQUEST
        }
        PipelineError::Audio(AudioError::Io(_)) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status.is_server_error() {
        error!("Request failed: {}", err);
    }

    error_response(status, err.to_string())
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /create-visit?visit_type=...
/// Create a new visit
pub async fn create_visit(
    State(state): State<AppState>,
    Query(params): Query<CreateVisitParams>,
) -> impl IntoResponse {
    match state.coordinator.create_visit(&params.visit_type).await {
        Ok(visit_id) => (StatusCode::OK, Json(CreateVisitResponse { visit_id })).into_response(),
        Err(e) => pipeline_error(e),
    }
}

/// POST /upload-chunk/:visit_id?chunk_number=N&is_final=bool
/// Accept one audio chunk (multipart field `chunk`) and queue it for processing
pub async fn upload_chunk(
    State(state): State<AppState>,
    Path(visit_id): Path<String>,
    Query(params): Query<UploadChunkParams>,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let mut audio = None;

    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                if field.name() != Some(CHUNK_FIELD) {
                    continue;
                }
                let extension = upload_extension(field.file_name(), field.content_type());
                match field.bytes().await {
                    Ok(bytes) => audio = Some((bytes, extension)),
                    Err(e) => {
                        warn!("Failed to read chunk upload for visit {}: {}", visit_id, e);
                        return error_response(StatusCode::BAD_REQUEST, e.body_text());
                    }
                }
            }
            Ok(None) => break,
            Err(e) => return error_response(StatusCode::BAD_REQUEST, e.body_text()),
        }
    }

    let Some((audio, extension)) = audio else {
        return error_response(
            StatusCode::BAD_REQUEST,
            format!("Missing multipart field '{}'", CHUNK_FIELD),
        );
    };

    info!(
        "Received chunk {} for visit {} ({} bytes, {}, final={})",
        params.chunk_number,
        visit_id,
        audio.len(),
        extension,
        params.is_final
    );

    match state
        .coordinator
        .upload_chunk(
            &visit_id,
            params.chunk_number,
            &audio,
            extension,
            params.is_final,
        )
        .await
    {
        Ok(()) => (
            StatusCode::OK,
            Json(UploadChunkResponse {
                detail: "Upload received, processing started".to_string(),
            }),
        )
            .into_response(),
        Err(e) => pipeline_error(e),
    }
}

/// GET /status/:visit_id
/// Current processing status of a visit
pub async fn get_status(
    State(state): State<AppState>,
    Path(visit_id): Path<String>,
) -> impl IntoResponse {
    match state.coordinator.get_status(&visit_id).await {
        Ok(status) => (StatusCode::OK, Json(StatusResponse { visit_id, status })).into_response(),
        Err(e) => pipeline_error(e),
    }
}

/// GET /report/:visit_id
/// Report accumulated so far (or only once completed, if so configured)
pub async fn get_report(
    State(state): State<AppState>,
    Path(visit_id): Path<String>,
) -> impl IntoResponse {
    if state.report_requires_completion {
        match state.coordinator.get_status(&visit_id).await {
            Ok(VisitStatus::Completed) => {}
            Ok(_) => return error_response(StatusCode::BAD_REQUEST, "Report not ready"),
            Err(e) => return pipeline_error(e),
        }
    }

    match state.coordinator.get_report(&visit_id).await {
        Ok(report) => (StatusCode::OK, Json(ReportResponse { visit_id, report })).into_response(),
        Err(e) => pipeline_error(e),
    }
}

/// POST /visits/:visit_id/reopen
/// Allow more chunks on a completed visit
pub async fn reopen_visit(
    State(state): State<AppState>,
    Path(visit_id): Path<String>,
) -> impl IntoResponse {
    match state.coordinator.reopen_visit(&visit_id).await {
        Ok(status) => (StatusCode::OK, Json(StatusResponse { visit_id, status })).into_response(),
        Err(e) => pipeline_error(e),
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
