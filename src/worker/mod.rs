//! Worker pool
//!
//! Each worker owns one receiver from the [`crate::queue::JobBroker`] and
//! runs the jobs it receives one at a time, recording progress in the
//! ledger.

pub mod runner;

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{error, info};

use crate::ledger::FjallStore;
use crate::pipeline::JobPipeline;
use crate::queue::JobEnvelope;

pub use runner::process_job;

pub struct WorkerPool {
    workers: JoinSet<()>,
}

impl WorkerPool {
    /// Spawn one worker task per receiver
    pub fn spawn(
        pipeline: Arc<JobPipeline>,
        store: FjallStore,
        receivers: Vec<mpsc::Receiver<JobEnvelope>>,
    ) -> Self {
        let mut workers = JoinSet::new();

        for (worker_id, mut receiver) in receivers.into_iter().enumerate() {
            let pipeline = pipeline.clone();
            let store = store.clone();

            workers.spawn(async move {
                info!(worker_id, "Worker started");
                while let Some(envelope) = receiver.recv().await {
                    process_job(&pipeline, &store, envelope).await;
                }
                info!(worker_id, "Worker channel closed, stopping");
            });
        }

        info!(workers = workers.len(), "Worker pool started");
        Self { workers }
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Wait for every worker to drain its channel and exit.
    ///
    /// Workers only stop once all senders (the broker) are dropped.
    pub async fn join(mut self) {
        while let Some(joined) = self.workers.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Worker task panicked");
            }
        }
    }
}
