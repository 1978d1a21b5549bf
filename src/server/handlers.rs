//! HTTP request handlers for the floorplan tiler API.
//!
//! # Endpoints
//!
//! - `POST /api/floorplans` - Submit a PDF for conversion
//! - `GET /api/jobs/{job_id}` - Poll a conversion job
//! - `DELETE /api/floorplans/{file_id}` - Delete one artifact set
//! - `POST /api/floorplans/delete` - Delete several artifact sets
//! - `GET /health` - Health check endpoint

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::artifact::{ArtifactReaper, DeleteOutcome, DeleteReport, FloorplanMetadata};
use crate::error::JobError;
use crate::job::{Job, JobManager, JobStatus, SubmitOutcome};
use crate::store::{validate_floorplan_id, ObjectStore};

// =============================================================================
// Application State
// =============================================================================

/// Shared application state passed to every handler.
pub struct AppState<S: ObjectStore + 'static> {
    /// Conversion job orchestration
    pub manager: Arc<JobManager<S>>,

    /// Artifact deletion
    pub reaper: Arc<ArtifactReaper<S>>,
}

impl<S: ObjectStore + 'static> AppState<S> {
    /// Create the state from its two services.
    pub fn new(manager: JobManager<S>, reaper: ArtifactReaper<S>) -> Self {
        Self {
            manager: Arc::new(manager),
            reaper: Arc::new(reaper),
        }
    }
}

impl<S: ObjectStore + 'static> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            manager: Arc::clone(&self.manager),
            reaper: Arc::clone(&self.reaper),
        }
    }
}

// =============================================================================
// Request / Response Types
// =============================================================================

/// Body of a conversion submission.
#[derive(Debug, Deserialize)]
pub struct ProcessFloorplanRequest {
    /// URL of the source PDF
    pub file_url: String,

    /// Caller-chosen floorplan identifier; keys the artifact set
    pub file_id: String,
}

/// Body of a bulk deletion request.
#[derive(Debug, Deserialize)]
pub struct DeleteFloorplansRequest {
    /// Ids to delete, each handled independently
    pub file_ids: Vec<String>,
}

/// Response for an accepted submission.
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    /// Token for polling the job
    pub job_id: String,

    /// Initial job status (always `queued`)
    pub status: JobStatus,

    /// Where to poll for progress
    pub status_url: String,
}

/// Response for a duplicate submission: the artifact set already exists.
#[derive(Debug, Serialize)]
pub struct DuplicateResponse {
    /// Marks the short-circuit so callers can tell it from a fresh job
    pub duplicate: bool,

    /// The existing artifact descriptor
    pub metadata: FloorplanMetadata,
}

/// JSON error response returned for all error conditions.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type identifier (e.g., "not_found", "invalid_request")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status code (included for convenience)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ErrorResponse {
    /// Create a new error response with status code.
    pub fn with_status(
        error: impl Into<String>,
        message: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: Some(status.as_u16()),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Convert JobError to an HTTP response.
///
/// 4xx errors are logged at WARN (client errors, 404s at DEBUG), 5xx at
/// ERROR.
impl IntoResponse for JobError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            JobError::InvalidRequest { reason } => (
                StatusCode::BAD_REQUEST,
                "invalid_request",
                reason.clone(),
            ),

            JobError::NotFound { job_id } => (
                StatusCode::NOT_FOUND,
                "not_found",
                format!("Job not found: {}", job_id),
            ),

            JobError::Storage(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "storage_error",
                e.to_string(),
            ),

            JobError::Metadata(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "metadata_error",
                e.to_string(),
            ),

            // Pipeline errors surface through job status rather than HTTP,
            // but map them anyway in case a handler bubbles one up
            JobError::Fetch(e) => (StatusCode::BAD_GATEWAY, "fetch_error", e.to_string()),
            JobError::Render(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "render_error",
                e.to_string(),
            ),
            JobError::Pyramid(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "pyramid_error",
                e.to_string(),
            ),
        };

        if status.is_server_error() {
            error!(
                error_type,
                status = status.as_u16(),
                "Server error: {}",
                message
            );
        } else if status == StatusCode::NOT_FOUND {
            debug!(
                error_type,
                status = status.as_u16(),
                "Resource not found: {}",
                message
            );
        } else {
            warn!(
                error_type,
                status = status.as_u16(),
                "Client error: {}",
                message
            );
        }

        let error_response = ErrorResponse::with_status(error_type, message, status);
        (status, Json(error_response)).into_response()
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Submit a PDF floorplan for conversion.
///
/// # Endpoint
///
/// `POST /api/floorplans`
///
/// # Response
///
/// - `202 Accepted`: new job queued, body carries `job_id` and `status_url`
/// - `200 OK`: artifact set already exists; body carries the descriptor and
///   `duplicate: true`, no job is created
/// - `400 Bad Request`: malformed `file_id` or `file_url`
/// - `500 Internal Server Error`: storage failure during the duplicate probe
pub async fn submit_floorplan_handler<S: ObjectStore + 'static>(
    State(state): State<AppState<S>>,
    Json(request): Json<ProcessFloorplanRequest>,
) -> Result<Response, JobError> {
    let outcome = state
        .manager
        .submit(&request.file_url, &request.file_id)
        .await?;

    let response = match outcome {
        SubmitOutcome::Accepted { job_id } => (
            StatusCode::ACCEPTED,
            Json(SubmitResponse {
                status_url: format!("/api/jobs/{}", job_id),
                job_id,
                status: JobStatus::Queued,
            }),
        )
            .into_response(),

        SubmitOutcome::Duplicate(metadata) => (
            StatusCode::OK,
            Json(DuplicateResponse {
                duplicate: true,
                metadata,
            }),
        )
            .into_response(),
    };

    Ok(response)
}

/// Poll a conversion job.
///
/// # Endpoint
///
/// `GET /api/jobs/{job_id}`
///
/// # Response
///
/// - `200 OK`: job snapshot with status, progress, message and result
/// - `404 Not Found`: unknown job id (including ids lost to a restart)
pub async fn job_status_handler<S: ObjectStore + 'static>(
    State(state): State<AppState<S>>,
    Path(job_id): Path<String>,
) -> Result<Json<Job>, JobError> {
    let job = state.manager.status(&job_id).await?;
    Ok(Json(job))
}

/// Delete one floorplan's artifact set.
///
/// # Endpoint
///
/// `DELETE /api/floorplans/{file_id}`
///
/// # Response
///
/// - `200 OK`: deletion report; a floorplan with nothing stored reports
///   `deleted_count: 0` with `success: true`
/// - `400 Bad Request`: malformed file id
pub async fn delete_floorplan_handler<S: ObjectStore + 'static>(
    State(state): State<AppState<S>>,
    Path(file_id): Path<String>,
) -> Result<Json<DeleteOutcome>, JobError> {
    validate_floorplan_id(&file_id)?;
    let outcome = state.reaper.delete_one(&file_id).await;
    Ok(Json(outcome))
}

/// Delete several floorplans' artifact sets.
///
/// # Endpoint
///
/// `POST /api/floorplans/delete`
///
/// # Response
///
/// `200 OK` with per-id results plus combined totals; one id's failure
/// never aborts the others.
pub async fn delete_floorplans_handler<S: ObjectStore + 'static>(
    State(state): State<AppState<S>>,
    Json(request): Json<DeleteFloorplansRequest>,
) -> Result<Json<DeleteReport>, JobError> {
    if request.file_ids.is_empty() {
        return Err(JobError::invalid("file_ids must not be empty"));
    }
    for file_id in &request.file_ids {
        validate_floorplan_id(file_id)?;
    }

    let report = state.reaper.delete_many(&request.file_ids).await;
    Ok(Json(report))
}

/// Handle health check requests.
///
/// # Endpoint
///
/// `GET /health`
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_serialization() {
        let response =
            ErrorResponse::with_status("not_found", "Job not found", StatusCode::NOT_FOUND);
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("not_found"));
        assert!(json.contains("404"));
    }

    #[test]
    fn test_job_error_to_status_code() {
        let err = JobError::invalid("bad file_id");
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let err = JobError::NotFound {
            job_id: "j-1".to_string(),
        };
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let err = JobError::Storage(crate::error::StorageError::S3("boom".to_string()));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let err = JobError::Fetch(crate::error::FetchError::Status {
            url: "https://example.com/p.pdf".to_string(),
            status: 404,
        });
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_health_response_serialization() {
        let response = HealthResponse {
            status: "healthy".to_string(),
            version: "0.1.0".to_string(),
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("0.1.0"));
    }

    #[test]
    fn test_submit_request_deserialization() {
        let request: ProcessFloorplanRequest = serde_json::from_str(
            r#"{"file_url": "https://example.com/plan.pdf", "file_id": "plan-1"}"#,
        )
        .unwrap();
        assert_eq!(request.file_url, "https://example.com/plan.pdf");
        assert_eq!(request.file_id, "plan-1");

        // Missing fields are rejected
        assert!(serde_json::from_str::<ProcessFloorplanRequest>(
            r#"{"file_url": "https://example.com/plan.pdf"}"#
        )
        .is_err());
    }

    #[test]
    fn test_delete_many_request_deserialization() {
        let request: DeleteFloorplansRequest =
            serde_json::from_str(r#"{"file_ids": ["a", "b"]}"#).unwrap();
        assert_eq!(request.file_ids, vec!["a", "b"]);
    }
}
