//! Completion callbacks
//!
//! Delivery is a single best-effort POST. Only the status code of the
//! response is looked at.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use crate::pipeline::JobResult;

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("Webhook request timed out")]
    Timeout,

    #[error("Webhook request failed: {0}")]
    RequestFailed(String),

    #[error("Webhook rejected with HTTP {status}")]
    Rejected { status: u16 },
}

/// Body posted to the callback URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookPayload {
    pub task_id: String,
    #[serde(flatten)]
    pub result: JobResult,
}

impl WebhookPayload {
    pub fn from_result(task_id: &str, result: &JobResult) -> Self {
        Self {
            task_id: task_id.to_string(),
            result: result.clone(),
        }
    }
}

#[derive(Clone)]
pub struct WebhookNotifier {
    client: Client,
}

impl WebhookNotifier {
    pub fn new(timeout: Duration) -> Result<Self, WebhookError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| WebhookError::RequestFailed(e.to_string()))?;
        Ok(Self { client })
    }

    pub async fn notify(&self, url: &str, payload: &WebhookPayload) -> Result<(), WebhookError> {
        debug!(url, task_id = %payload.task_id, "Sending webhook");

        let response = self
            .client
            .post(url)
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    WebhookError::Timeout
                } else {
                    WebhookError::RequestFailed(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(WebhookError::Rejected {
                status: status.as_u16(),
            });
        }

        info!(url, status = status.as_u16(), "Webhook delivered");
        Ok(())
    }
}
