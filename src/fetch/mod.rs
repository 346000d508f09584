//! Batched media downloads
//!
//! [`BatchFetcher`] downloads a job's URLs in fixed-size batches. A batch
//! runs its fetches concurrently and is joined completely before the next
//! batch starts, so at most `batch_size` requests are ever in flight. Every
//! failure is per item: it is logged, the item is dropped, and the batch
//! carries on. Nothing is retried.

mod naming;

pub use naming::local_file_name;

use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Client, redirect};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::humanize::ByteSize;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Request timed out")]
    Timeout,

    #[error("HTTP {status}: {reason}")]
    Status { status: u16, reason: String },

    #[error("Too many redirects")]
    TooManyRedirects,

    #[error("No content received")]
    EmptyBody,

    #[error("Failed to write payload: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid HTTP client configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, FetchError>;

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub batch_size: usize,
    pub request_timeout: Duration,
    pub max_redirects: usize,
    pub user_agent: String,
    /// Accept invalid TLS certificates from media origins
    pub insecure_skip_verify: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            batch_size: 4,
            request_timeout: Duration::from_secs(30),
            max_redirects: 10,
            user_agent: format!("ZipBox/{}", env!("CARGO_PKG_VERSION")),
            insecure_skip_verify: false,
        }
    }
}

impl From<&crate::config::FetchConfig> for HttpConfig {
    fn from(config: &crate::config::FetchConfig) -> Self {
        Self {
            batch_size: config.batch_size,
            request_timeout: config.request_timeout(),
            max_redirects: config.max_redirects,
            user_agent: config.user_agent.clone(),
            insecure_skip_verify: config.insecure_skip_verify,
        }
    }
}

/// A successfully downloaded resource, stored at `path`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResult {
    pub source_url: String,
    pub local_name: String,
    pub path: PathBuf,
    pub size: u64,
}

/// Batched downloader
#[derive(Clone)]
pub struct BatchFetcher {
    client: Client,
    config: HttpConfig,
}

impl BatchFetcher {
    pub fn new(config: HttpConfig) -> Result<Self> {
        let mut builder = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(&config.user_agent)
            .redirect(redirect::Policy::limited(config.max_redirects));

        if config.insecure_skip_verify {
            warn!("TLS certificate verification disabled for media downloads");
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder
            .build()
            .map_err(|e| FetchError::InvalidConfig(e.to_string()))?;

        Ok(Self { client, config })
    }

    pub fn batch_size(&self) -> usize {
        self.config.batch_size.max(1)
    }

    /// Download every URL into `download_dir`, returning only the successes.
    ///
    /// Results are grouped by batch in submission order; inside a batch they
    /// appear in completion order.
    pub async fn fetch_all(&self, urls: &[String], download_dir: &Path) -> Vec<FetchResult> {
        let batch_size = self.batch_size();
        let total_batches = urls.len().div_ceil(batch_size);
        info!(
            count = urls.len(),
            dir = %download_dir.display(),
            "Starting download"
        );

        let mut fetched = Vec::with_capacity(urls.len());

        for (index, batch) in urls.chunks(batch_size).enumerate() {
            info!(batch = index + 1, total_batches, "Processing batch");

            let mut tasks = JoinSet::new();
            for url in batch {
                let fetcher = self.clone();
                let url = url.clone();
                let dir = download_dir.to_path_buf();
                tasks.spawn(async move {
                    let result = fetcher.fetch_one(&url, &dir).await;
                    (url, result)
                });
            }

            let mut succeeded = 0;
            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok((_, Ok(item))) => {
                        succeeded += 1;
                        fetched.push(item);
                    }
                    Ok((url, Err(e))) => {
                        warn!(%url, error = %e, "Download failed, skipping");
                    }
                    Err(e) => {
                        error!(error = %e, "Download task aborted, skipping");
                    }
                }
            }

            info!(
                batch = index + 1,
                succeeded,
                size = batch.len(),
                "Batch completed"
            );
        }

        info!(
            succeeded = fetched.len(),
            total = urls.len(),
            "Download complete"
        );

        fetched
    }

    /// Download once (no retry)
    async fn fetch_one(&self, url: &str, dir: &Path) -> Result<FetchResult> {
        debug!(url, "Attempting download");

        self.probe(url).await;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(map_request_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        let body = response.bytes().await.map_err(map_request_error)?;
        if body.is_empty() {
            return Err(FetchError::EmptyBody);
        }

        let local_name = local_file_name(url);
        let path = dir.join(&local_name);
        write_payload(dir, &path, &body).await?;

        let size = tokio::fs::metadata(&path).await?.len();
        if size == 0 {
            return Err(FetchError::EmptyBody);
        }

        info!(url, file = %local_name, size = %ByteSize(size), "Downloaded");

        Ok(FetchResult {
            source_url: url.to_string(),
            local_name,
            path,
            size,
        })
    }

    /// HEAD request for logging only; failures are ignored
    async fn probe(&self, url: &str) {
        match self.client.head(url).send().await {
            Ok(response) => {
                let header = |name| {
                    response
                        .headers()
                        .get(name)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("unknown")
                        .to_string()
                };
                info!(
                    url,
                    status = response.status().as_u16(),
                    content_type = %header(CONTENT_TYPE),
                    content_length = %header(CONTENT_LENGTH),
                    "Probed resource"
                );
            }
            Err(e) => debug!(url, error = %e, "Probe failed, continuing"),
        }
    }
}

/// Write through a uniquely named part file and rename into place, so two
/// items that share a name never interleave their bytes.
async fn write_payload(dir: &Path, path: &Path, body: &[u8]) -> Result<()> {
    let part = dir.join(format!(".{}.part", Uuid::new_v4()));
    tokio::fs::write(&part, body).await?;
    if let Err(e) = tokio::fs::rename(&part, path).await {
        let _ = tokio::fs::remove_file(&part).await;
        return Err(e.into());
    }
    Ok(())
}

fn map_request_error(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout
    } else if e.is_redirect() {
        FetchError::TooManyRedirects
    } else {
        FetchError::RequestFailed(e.to_string())
    }
}
