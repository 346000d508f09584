use serde::{Deserialize, Serialize};
use std::fmt;

/// One accepted batch request. Immutable once handed to the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    /// Caller-supplied identifier; also names the uploaded archive
    pub job_id: String,
    pub job_type: String,
    pub urls: Vec<String>,
    pub webhook_url: Option<String>,
}

impl Job {
    pub fn archive_name(&self) -> String {
        format!("{}.zip", self.job_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Completed,
    Failed,
}

/// Final outcome of one pipeline execution.
///
/// Serialized field names follow the webhook contract (`unique_id`, `type`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResult {
    #[serde(rename = "unique_id")]
    pub job_id: String,
    #[serde(rename = "type")]
    pub job_type: String,
    pub status: JobStatus,
    pub download_url: Option<String>,
    pub file_count: usize,
    pub failed_count: usize,
}

impl JobResult {
    pub fn completed(job: &Job, download_url: String, file_count: usize) -> Self {
        Self {
            job_id: job.job_id.clone(),
            job_type: job.job_type.clone(),
            status: JobStatus::Completed,
            download_url: Some(download_url),
            file_count,
            failed_count: job.urls.len().saturating_sub(file_count),
        }
    }
}

/// Pipeline stages, in execution order, plus the terminal failure state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStage {
    Fetching,
    Verifying,
    Archiving,
    Uploading,
    Notifying,
    Done,
    Failed,
}

impl fmt::Display for JobStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobStage::Fetching => "fetching",
            JobStage::Verifying => "verifying",
            JobStage::Archiving => "archiving",
            JobStage::Uploading => "uploading",
            JobStage::Notifying => "notifying",
            JobStage::Done => "done",
            JobStage::Failed => "failed",
        };
        f.write_str(name)
    }
}
