use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::pipeline::{Job, JobResult};

/// Lifecycle of one accepted request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    Pending,
    Started,
    Success,
    Failure,
}

/// Ledger entry for one task, keyed by `task_id`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub task_id: String,
    pub job_id: String,
    pub job_type: String,
    pub status: TaskState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<JobResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TaskRecord {
    pub fn pending(task_id: &str, job: &Job) -> Self {
        let now = Utc::now();
        Self {
            task_id: task_id.to_string(),
            job_id: job.job_id.clone(),
            job_type: job.job_type.clone(),
            status: TaskState::Pending,
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn mark_started(&mut self) {
        self.transition(TaskState::Started);
    }

    pub fn mark_succeeded(&mut self, result: JobResult) {
        self.result = Some(result);
        self.error = None;
        self.transition(TaskState::Success);
    }

    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.error = Some(error.into());
        self.transition(TaskState::Failure);
    }

    fn transition(&mut self, status: TaskState) {
        self.status = status;
        self.updated_at = Utc::now();
    }
}
