mod common;

use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use common::media_server;
use zipbox::fetch::{BatchFetcher, HttpConfig};
use zipbox::ledger::{FjallStore, TaskRecord, TaskState};
use zipbox::pipeline::{Job, JobPipeline, JobStatus};
use zipbox::queue::JobEnvelope;
use zipbox::storage::ObjectStoreBackend;
use zipbox::webhook::WebhookNotifier;
use zipbox::worker::process_job;

#[tokio::test]
async fn test_successful_job_is_recorded_with_result() {
    let media = media_server().await;
    let temp_dir = TempDir::new().unwrap();
    let store = FjallStore::open(temp_dir.path().join("ledger")).unwrap();

    let pipeline = JobPipeline::builder()
        .fetcher(
            BatchFetcher::new(HttpConfig {
                request_timeout: Duration::from_secs(1),
                ..HttpConfig::default()
            })
            .unwrap(),
        )
        .connector(Arc::new(ObjectStoreBackend::in_memory(
            "files.example.com",
            "exports",
        )))
        .notifier(WebhookNotifier::new(Duration::from_secs(1)).unwrap())
        .temp_root(temp_dir.path().join("work"))
        .build();

    let job = Job {
        job_id: "campaign-9".to_string(),
        job_type: "campaign".to_string(),
        urls: vec![media.url("media/a.mp4"), media.url("missing/b.mp4")],
        webhook_url: None,
    };
    store.upsert(&TaskRecord::pending("task-9", &job)).unwrap();

    let state = process_job(
        &pipeline,
        &store,
        JobEnvelope {
            task_id: "task-9".to_string(),
            job,
        },
    )
    .await;

    assert_eq!(state, TaskState::Success);

    let record = store.get("task-9").unwrap().unwrap();
    assert_eq!(record.status, TaskState::Success);
    assert!(record.error.is_none());
    assert!(record.updated_at >= record.created_at);

    let result = record.result.unwrap();
    assert_eq!(result.status, JobStatus::Completed);
    assert_eq!(result.job_id, "campaign-9");
    assert_eq!(result.file_count, 1);
    assert_eq!(result.failed_count, 1);
    assert_eq!(
        result.download_url.as_deref(),
        Some("https://files.example.com/file/exports/campaign-9.zip")
    );

    let stats = store.stats().unwrap();
    assert_eq!(stats.succeeded, 1);
    assert_eq!(stats.pending, 0);
}
