//! Audit submission and status endpoints.

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::job::{DeviceProfile, JobState};
use crate::queue::JobQueue;
use crate::store::{artifact_filename, report_url};

/// Request body for submitting an audit.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAuditRequest {
    /// Target URL. Must be non-empty; not otherwise validated here.
    pub url: String,
    /// Device profile to emulate; defaults to mobile.
    #[serde(default)]
    pub device_profile: DeviceProfile,
}

/// Response for a successfully queued audit.
///
/// `report_url` is a prediction: it names where the report will appear
/// once the worker gets to the job, not something that exists yet.
/// Submission success means "accepted for processing", not "completed".
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAuditResponse {
    pub job_id: Uuid,
    pub report_url: String,
}

/// Response for a status lookup.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditStatusResponse {
    pub state: JobState,
    /// Report URL, present only for completed jobs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

/// Creates the audits router.
pub fn router(queue: JobQueue) -> Router {
    Router::new()
        .route("/audit", post(submit_audit))
        .route("/audit-status/{job_id}", get(audit_status))
        .with_state(queue)
}

/// POST /audit
///
/// Validates the URL, enqueues a job, and immediately returns the job id
/// together with the deterministic report URL the worker will eventually
/// write to.
async fn submit_audit(
    State(queue): State<JobQueue>,
    Json(input): Json<SubmitAuditRequest>,
) -> Result<Json<SubmitAuditResponse>, AppError> {
    let url = input.url.trim();
    if url.is_empty() {
        return Err(AppError::BadRequest("url is required".to_string()));
    }

    let job = queue.enqueue(url, input.device_profile).await?;

    tracing::info!(job_id = %job.id, url = %job.url, profile = %job.device_profile, "audit queued");

    let filename = artifact_filename(&job.url, job.device_profile, job.submitted_at_ms);
    Ok(Json(SubmitAuditResponse {
        job_id: job.id,
        report_url: report_url(&filename),
    }))
}

/// GET /audit-status/{job_id}
///
/// Pull-based completion view over the same store the worker writes to.
/// Failed jobs report only their state; the stored diagnostic stays
/// internal.
async fn audit_status(
    State(queue): State<JobQueue>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<AuditStatusResponse>, AppError> {
    let job = queue
        .get_by_id(job_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("no job with id {job_id}")))?;

    let result = match job.state {
        JobState::Completed => job.result,
        _ => None,
    };

    Ok(Json(AuditStatusResponse {
        state: job.state,
        result,
    }))
}
