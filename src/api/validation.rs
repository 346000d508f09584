use reqwest::Url;
use thiserror::Error;

use super::models::DownloadRequest;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestValidationError {
    #[error("unique_id must not be empty")]
    EmptyUniqueId,
    #[error("urls must contain between 1 and {max} entries")]
    InvalidUrlCount { max: usize },
    #[error("url '{0}' must be an absolute http/https url")]
    InvalidUrl(String),
    #[error("webhook_url '{0}' must be an absolute http/https url")]
    InvalidWebhookUrl(String),
}

pub fn validate_request(
    request: &DownloadRequest,
    max_urls: usize,
) -> Result<(), RequestValidationError> {
    if request.unique_id.trim().is_empty() {
        return Err(RequestValidationError::EmptyUniqueId);
    }

    if !(1..=max_urls).contains(&request.urls.len()) {
        return Err(RequestValidationError::InvalidUrlCount { max: max_urls });
    }

    for url in &request.urls {
        if !is_http_url(url) {
            return Err(RequestValidationError::InvalidUrl(url.clone()));
        }
    }

    if let Some(webhook) = &request.webhook_url {
        if !is_http_url(webhook) {
            return Err(RequestValidationError::InvalidWebhookUrl(webhook.clone()));
        }
    }

    Ok(())
}

fn is_http_url(value: &str) -> bool {
    Url::parse(value)
        .map(|url| matches!(url.scheme(), "http" | "https") && url.host().is_some())
        .unwrap_or(false)
}
