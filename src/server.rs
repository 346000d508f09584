use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{error, info};
use uuid::Uuid;

use zipbox::api::{self, state::AppState};
use zipbox::config::Config;
use zipbox::ledger::FjallStore;
use zipbox::observability::Metrics;
use zipbox::pipeline::{Job, JobPipeline};
use zipbox::queue::JobBroker;
use zipbox::worker::WorkerPool;

use crate::cli::{RunArgs, ServerArgs};

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

const PRUNE_INTERVAL: Duration = Duration::from_secs(60 * 60);

fn load_config(path: Option<PathBuf>) -> Result<Config, AnyError> {
    info!("Loading configuration");
    let config = match path {
        Some(path) => Config::load_from_path(path),
        None => Config::load(),
    }
    .map_err(|e| format!("Failed to load config: {e}"))?;
    Ok(config)
}

/// Intake API plus worker pool, until SIGINT/SIGTERM
pub async fn run(config_path: Option<PathBuf>, args: ServerArgs) -> Result<(), AnyError> {
    let mut config = load_config(config_path)?;
    if let Some(address) = args.address {
        config.server.bind_addr = address;
    }

    info!(path = %config.server.ledger_path.display(), "Opening Fjall store");
    let store = FjallStore::open(&config.server.ledger_path)
        .map_err(|e| format!("Failed to open Fjall store: {e}"))?;
    match store.last_pruned_at() {
        Ok(Some(at)) => info!(last_pruned_at = %at, "Ledger opened"),
        Ok(None) => info!("Ledger opened, never pruned"),
        Err(e) => error!(error = %e, "Failed to read last prune time"),
    }

    let metrics = Arc::new(Metrics::new());
    let pipeline = Arc::new(JobPipeline::from_config(&config, metrics.clone())?);

    let (broker, receivers) = JobBroker::new(config.worker.workers, config.worker.channel_size);
    let pool = WorkerPool::spawn(pipeline, store.clone(), receivers);
    let pruner = spawn_pruner(store.clone(), config.retention.job_ttl());

    let address = config.server.bind_addr;
    let state = AppState::new(config, store.clone(), Arc::new(broker), metrics.clone());

    // Returns after shutdown; dropping the router drops the broker
    api::serve(address, state).await?;

    pruner.abort();
    info!(workers = pool.len(), "Waiting for workers to drain");
    pool.join().await;

    store
        .persist()
        .map_err(|e| format!("Failed to persist ledger: {e}"))?;
    info!(metrics = ?metrics.snapshot(), "ZipBox stopped");

    Ok(())
}

/// Run one job in the foreground and print the result
pub async fn run_once(config_path: Option<PathBuf>, args: RunArgs) -> Result<(), AnyError> {
    let config = load_config(config_path)?;
    let pipeline = JobPipeline::from_config(&config, Arc::new(Metrics::new()))?;

    let job = Job {
        job_id: args.job_id,
        job_type: args.job_type,
        urls: args.urls,
        webhook_url: args.webhook,
    };
    let task_id = Uuid::now_v7().to_string();

    let result = pipeline.run(&job, &task_id).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(())
}

fn spawn_pruner(store: FjallStore, ttl: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(PRUNE_INTERVAL);
        loop {
            ticker.tick().await;
            if let Err(e) = store.prune_expired(ttl) {
                error!(error = %e, "Ledger pruning failed");
            }
        }
    })
}
