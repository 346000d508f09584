use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use std::collections::HashMap;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::{
    models::{DownloadRequest, DownloadResponse, HealthResponse, TaskStatusResponse},
    state::AppState,
    utils::{parse_content_type, read_body},
    validation::validate_request,
};
use crate::api::error::ApiError;
use crate::ledger::TaskRecord;

/// Batch intake endpoint (POST /download-videos)
///
/// ## Flow:
/// 1. Require `Content-Type: application/json`
/// 2. Read the (already decompressed) body, enforce `server.max_payload_bytes`
/// 3. Deserialize and validate the request
/// 4. Generate a UUIDv7 `task_id` and store a `pending` task record
/// 5. Hand the job to the broker
/// 6. Return `{success, status: "pending", task_id}`
///
/// Processing happens in the background; poll `GET /tasks/{task_id}` or
/// wait for the webhook.
pub async fn download_videos(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: axum::body::Body,
) -> Result<impl IntoResponse, ApiError> {
    parse_content_type(&headers)?;

    let body_bytes = read_body(body, state.config.server.max_payload_bytes.as_usize()).await?;
    let request: DownloadRequest = serde_json::from_slice(&body_bytes)?;
    validate_request(&request, state.config.server.max_urls_per_job)?;

    let task_id = Uuid::now_v7().to_string();
    let job = request.into_job();

    state
        .store
        .upsert(&TaskRecord::pending(&task_id, &job))
        .map_err(|e| ApiError::Internal(format!("Failed to store task: {e}")))?;

    let job_id = job.job_id.clone();
    let url_count = job.urls.len();

    if let Err(e) = state.broker.enqueue(task_id.clone(), job).await {
        warn!(%task_id, %job_id, error = %e, "Failed to enqueue job");
        let outcome = state.store.get(&task_id).and_then(|existing| match existing {
            Some(mut record) => {
                record.mark_failed(e.to_string());
                state.store.upsert(&record)
            }
            None => Ok(()),
        });
        if let Err(store_err) = outcome {
            error!(%task_id, error = %store_err, "Failed to record enqueue failure");
        }
        return Err(ApiError::EnqueueFailed(e.to_string()));
    }

    state.metrics.job_accepted();
    info!(%task_id, %job_id, urls = url_count, "Job accepted");

    Ok((StatusCode::OK, Json(DownloadResponse::pending(task_id))))
}

/// Task status endpoint (GET /tasks/{task_id})
pub async fn get_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state
        .store
        .get(&task_id)
        .map_err(|e| ApiError::Internal(format!("Failed to get task: {e}")))?
        .ok_or_else(|| ApiError::NotFound(format!("task {task_id}")))?;

    Ok((StatusCode::OK, Json(TaskStatusResponse::from(record))))
}

/// Health check endpoint (GET /health)
///
/// Reports 503 when any worker channel has closed.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let mut components = HashMap::new();
    components.insert("api".to_string(), "healthy".to_string());

    let broker_status = if state.broker.health_check() {
        "healthy"
    } else {
        "unhealthy"
    };
    components.insert("broker".to_string(), broker_status.to_string());

    let all_healthy = components.values().all(|status| status == "healthy");
    let (status_code, overall_status) = if all_healthy {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
    };

    let response = HealthResponse {
        status: overall_status.to_string(),
        components,
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    (status_code, Json(response))
}
