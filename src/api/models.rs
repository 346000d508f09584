//! API models for the ZipBox intake and status endpoints.
//!
//! - `POST /download-videos` accepts a [`DownloadRequest`] and answers with a
//!   [`DownloadResponse`] carrying the `task_id`
//! - `GET /tasks/{task_id}` returns a [`TaskStatusResponse`]
//!
//! ```json
//! {
//!   "urls": ["https://cdn.example.com/clips/1.mp4"],
//!   "webhook_url": "https://hooks.example.com/zipbox",
//!   "unique_id": "campaign-8812",
//!   "model_type": "campaign"
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::ledger::{TaskRecord, TaskState};
use crate::pipeline::{Job, JobResult};

pub const DEFAULT_MODEL_TYPE: &str = "campaign";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DownloadRequest {
    pub urls: Vec<String>,
    #[serde(default)]
    pub webhook_url: Option<String>,
    pub unique_id: String,
    #[serde(default = "default_model_type")]
    pub model_type: String,
}

fn default_model_type() -> String {
    DEFAULT_MODEL_TYPE.to_string()
}

impl DownloadRequest {
    pub fn into_job(self) -> Job {
        Job {
            job_id: self.unique_id,
            job_type: self.model_type,
            urls: self.urls,
            webhook_url: self.webhook_url,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct DownloadResponse {
    pub success: bool,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl DownloadResponse {
    pub fn pending(task_id: String) -> Self {
        Self {
            success: true,
            status: "pending".to_string(),
            task_id: Some(task_id),
            detail: None,
        }
    }

    pub fn error(detail: String) -> Self {
        Self {
            success: false,
            status: "error".to_string(),
            task_id: None,
            detail: Some(detail),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TaskStatusResponse {
    pub task_id: String,
    pub job_id: String,
    pub status: TaskState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<JobResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub created_at: chrono::DateTime<chrono::Utc>,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<TaskRecord> for TaskStatusResponse {
    fn from(record: TaskRecord) -> Self {
        Self {
            task_id: record.task_id,
            job_id: record.job_id,
            status: record.status,
            result: record.result,
            error: record.error,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub components: HashMap<String, String>,
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_type_defaults_to_campaign() {
        let request: DownloadRequest = serde_json::from_str(
            r#"{"urls": ["https://cdn.example.com/a.mp4"], "unique_id": "abc"}"#,
        )
        .unwrap();

        let job = request.into_job();
        assert_eq!(job.job_type, "campaign");
        assert_eq!(job.job_id, "abc");
        assert!(job.webhook_url.is_none());
    }

    #[test]
    fn test_response_shapes() {
        let ok = serde_json::to_value(DownloadResponse::pending("t-1".into())).unwrap();
        assert_eq!(
            ok,
            serde_json::json!({"success": true, "status": "pending", "task_id": "t-1"})
        );

        let err = serde_json::to_value(DownloadResponse::error("closed".into())).unwrap();
        assert_eq!(
            err,
            serde_json::json!({"success": false, "status": "error", "detail": "closed"})
        );
    }
}
