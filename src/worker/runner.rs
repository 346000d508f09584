//! Job runner - executes one JobEnvelope and records its outcome

use tracing::{error, info};

use crate::ledger::{FjallStore, TaskRecord, TaskState};
use crate::pipeline::{Job, JobPipeline};
use crate::queue::JobEnvelope;

/// Run one job and record `started`, then `success` or `failure`.
///
/// Ledger write failures are logged; they never abort the job. Returns the
/// final state.
pub async fn process_job(
    pipeline: &JobPipeline,
    store: &FjallStore,
    envelope: JobEnvelope,
) -> TaskState {
    let JobEnvelope { task_id, job } = envelope;

    info!(%task_id, job_id = %job.job_id, "Processing job");
    record(store, &task_id, &job, |r| r.mark_started());

    match pipeline.run(&job, &task_id).await {
        Ok(result) => {
            record(store, &task_id, &job, |r| r.mark_succeeded(result));
            TaskState::Success
        }
        Err(e) => {
            let message = e.to_string();
            record(store, &task_id, &job, |r| r.mark_failed(message));
            TaskState::Failure
        }
    }
}

fn record<F>(store: &FjallStore, task_id: &str, job: &Job, apply: F)
where
    F: FnOnce(&mut TaskRecord),
{
    let outcome = match store.get(task_id) {
        Ok(Some(mut existing)) => {
            apply(&mut existing);
            store.upsert(&existing)
        }
        // Intake always writes a pending record first; recreate it if it was pruned
        Ok(None) => {
            let mut fresh = TaskRecord::pending(task_id, job);
            apply(&mut fresh);
            store.upsert(&fresh)
        }
        Err(e) => Err(e),
    };

    if let Err(e) = outcome {
        error!(task_id, error = %e, "Failed to update task record");
    }
}
