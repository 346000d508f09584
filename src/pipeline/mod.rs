//! Job pipeline
//!
//! One [`JobPipeline::run`] call takes a [`Job`] through
//! fetch → verify → archive → upload → notify. Every job gets its own
//! scratch directory which is removed when the run returns, whichever stage
//! it stopped at. Nothing is retried and no failed stage is compensated.

mod types;

pub use types::{Job, JobResult, JobStage, JobStatus};

use bon::Builder;
use bytes::Bytes;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use thiserror::Error;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::archive::{ArchiveBuilder, ArchiveError};
use crate::config::Config;
use crate::fetch::{BatchFetcher, HttpConfig};
use crate::humanize::ByteSize;
use crate::observability::Metrics;
use crate::storage::{self, StorageError, StoreConnector};
use crate::webhook::{WebhookNotifier, WebhookPayload};

const WORKSPACE_PREFIX: &str = "zipbox-";
const ARCHIVE_FILE: &str = "archive.zip";
const DOWNLOAD_DIR: &str = "downloads";

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Job {job_id}: no successful downloads, attempted {attempted}")]
    NoDownloads { job_id: String, attempted: usize },

    #[error("Job {job_id}: archive failed: {source}")]
    Archive {
        job_id: String,
        #[source]
        source: ArchiveError,
    },

    #[error("Job {job_id}: upload failed: {source}")]
    Upload {
        job_id: String,
        #[source]
        source: StorageError,
    },

    #[error("Job {job_id}: cannot prepare workspace: {source}")]
    Workspace {
        job_id: String,
        #[source]
        source: io::Error,
    },

    #[error("Pipeline setup failed: {0}")]
    Setup(String),
}

impl PipelineError {
    /// Stage the job was in when it failed
    pub fn stage(&self) -> JobStage {
        match self {
            PipelineError::NoDownloads { .. } => JobStage::Verifying,
            PipelineError::Archive { .. } => JobStage::Archiving,
            PipelineError::Upload { .. } => JobStage::Uploading,
            PipelineError::Workspace { .. } | PipelineError::Setup(_) => JobStage::Fetching,
        }
    }
}

#[derive(Builder)]
pub struct JobPipeline {
    fetcher: BatchFetcher,
    connector: Arc<dyn StoreConnector>,
    notifier: WebhookNotifier,
    /// Parent of per-job workspaces; the system temp dir when unset
    temp_root: Option<PathBuf>,
    #[builder(default)]
    archiver: ArchiveBuilder,
    #[builder(default)]
    metrics: Arc<Metrics>,
}

impl JobPipeline {
    pub fn from_config(config: &Config, metrics: Arc<Metrics>) -> Result<Self, PipelineError> {
        let fetcher = BatchFetcher::new(HttpConfig::from(&config.fetch))
            .map_err(|e| PipelineError::Setup(e.to_string()))?;
        let connector = storage::connector_from_config(&config.storage)
            .map_err(|e| PipelineError::Setup(e.to_string()))?;
        let notifier = WebhookNotifier::new(config.webhook.timeout())
            .map_err(|e| PipelineError::Setup(e.to_string()))?;

        Ok(Self::builder()
            .fetcher(fetcher)
            .connector(connector)
            .notifier(notifier)
            .maybe_temp_root(config.worker.temp_root.clone())
            .archiver(
                ArchiveBuilder::new()
                    .with_compression_level(config.worker.archive_compression_level),
            )
            .metrics(metrics)
            .build())
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Run one job to completion. `task_id` identifies this execution and is
    /// echoed to the webhook.
    pub async fn run(&self, job: &Job, task_id: &str) -> Result<JobResult, PipelineError> {
        let span = info_span!("job", job_id = %job.job_id, task_id);

        async {
            info!(urls = job.urls.len(), job_type = %job.job_type, "Job started");

            let outcome = self.execute(job, task_id).await;
            match &outcome {
                Ok(result) => {
                    self.metrics.job_completed();
                    info!(
                        file_count = result.file_count,
                        failed_count = result.failed_count,
                        "Job completed"
                    );
                }
                Err(e) => {
                    enter(JobStage::Failed);
                    self.metrics.job_failed();
                    error!(stage = %e.stage(), error = %e, "Job failed");
                }
            }
            outcome
        }
        .instrument(span)
        .await
    }

    async fn execute(&self, job: &Job, task_id: &str) -> Result<JobResult, PipelineError> {
        // Dropped on every return below, taking payloads and the archive with it
        let workspace = self.create_workspace(job).await?;
        let download_dir = workspace.path().join(DOWNLOAD_DIR);
        tokio::fs::create_dir(&download_dir)
            .await
            .map_err(|source| PipelineError::Workspace {
                job_id: job.job_id.clone(),
                source,
            })?;

        enter(JobStage::Fetching);
        let fetched = self.fetcher.fetch_all(&job.urls, &download_dir).await;
        let file_count = fetched.len();
        self.metrics
            .files_fetched(file_count, job.urls.len().saturating_sub(file_count));

        enter(JobStage::Verifying);
        if fetched.is_empty() {
            return Err(PipelineError::NoDownloads {
                job_id: job.job_id.clone(),
                attempted: job.urls.len(),
            });
        }

        enter(JobStage::Archiving);
        let archive_err = |source: ArchiveError| PipelineError::Archive {
            job_id: job.job_id.clone(),
            source,
        };
        let target = workspace.path().join(ARCHIVE_FILE);
        let archiver = self.archiver;
        let summary = tokio::task::spawn_blocking(move || archiver.build(&fetched, &target))
            .await
            .map_err(|e| archive_err(ArchiveError::Io(io::Error::other(e))))?
            .map_err(archive_err)?;
        let data = read_archive(&summary.path).await.map_err(archive_err)?;

        enter(JobStage::Uploading);
        let upload_err = |source: StorageError| PipelineError::Upload {
            job_id: job.job_id.clone(),
            source,
        };
        let store = self.connector.connect().await.map_err(upload_err)?;
        info!(size = %ByteSize(summary.size), "Uploading archive");
        let download_url = store
            .upload(data, &job.archive_name())
            .await
            .map_err(upload_err)?;

        let result = JobResult::completed(job, download_url, file_count);

        if let Some(webhook_url) = &job.webhook_url {
            enter(JobStage::Notifying);
            let payload = WebhookPayload::from_result(task_id, &result);
            if let Err(e) = self.notifier.notify(webhook_url, &payload).await {
                self.metrics.webhook_failed();
                warn!(url = %webhook_url, error = %e, "Webhook notification failed");
            }
        }

        enter(JobStage::Done);
        Ok(result)
    }

    async fn create_workspace(&self, job: &Job) -> Result<TempDir, PipelineError> {
        let workspace_err = |source: io::Error| PipelineError::Workspace {
            job_id: job.job_id.clone(),
            source,
        };

        let mut builder = tempfile::Builder::new();
        builder.prefix(WORKSPACE_PREFIX);

        let workspace = match &self.temp_root {
            Some(root) => {
                tokio::fs::create_dir_all(root).await.map_err(workspace_err)?;
                builder.tempdir_in(root)
            }
            None => builder.tempdir(),
        }
        .map_err(workspace_err)?;

        debug!(path = %workspace.path().display(), "Created job workspace");
        Ok(workspace)
    }
}

async fn read_archive(path: &Path) -> Result<Bytes, ArchiveError> {
    let data = tokio::fs::read(path).await?;
    if data.is_empty() {
        return Err(ArchiveError::Missing(path.to_path_buf()));
    }
    Ok(Bytes::from(data))
}

fn enter(stage: JobStage) {
    debug!(%stage, "Entering stage");
}
