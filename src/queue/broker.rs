use crate::pipeline::Job;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum QueueError {
    #[error("No workers configured")]
    NoWorkers,

    #[error("All worker channels are closed")]
    Closed,
}

/// A job as handed to a worker, tagged with its execution id
#[derive(Clone, Debug)]
pub struct JobEnvelope {
    pub task_id: String,
    pub job: Job,
}

/// JobBroker distributes accepted jobs from the API to the worker pool
///
/// Each worker owns one bounded mpsc channel. Jobs go round-robin across
/// the channels; a full channel makes `enqueue` wait (backpressure). A
/// closed channel is skipped and the next worker is tried.
///
/// The broker is not a task of its own. API handlers call it directly.
pub struct JobBroker {
    worker_channels: Vec<mpsc::Sender<JobEnvelope>>,
    next_worker: AtomicUsize,
}

impl JobBroker {
    /// Create a broker and one receiver per worker
    pub fn new(num_workers: usize, channel_size: usize) -> (Self, Vec<mpsc::Receiver<JobEnvelope>>) {
        info!(num_workers, channel_size, "Creating JobBroker with worker channels");

        let mut worker_channels = Vec::with_capacity(num_workers);
        let mut worker_receivers = Vec::with_capacity(num_workers);

        for worker_id in 0..num_workers {
            let (tx, rx) = mpsc::channel(channel_size.max(1));
            worker_channels.push(tx);
            worker_receivers.push(rx);
            debug!(worker_id, "Created worker channel");
        }

        let broker = Self {
            worker_channels,
            next_worker: AtomicUsize::new(0),
        };

        (broker, worker_receivers)
    }

    /// Hand a job to the next live worker. Returns that worker's index.
    pub async fn enqueue(&self, task_id: String, job: Job) -> Result<usize, QueueError> {
        let workers = self.worker_channels.len();
        if workers == 0 {
            return Err(QueueError::NoWorkers);
        }

        let mut envelope = JobEnvelope { task_id, job };
        let start = self.next_worker.fetch_add(1, Ordering::Relaxed);

        for attempt in 0..workers {
            let worker_idx = (start + attempt) % workers;

            match self.worker_channels[worker_idx].send(envelope).await {
                Ok(()) => {
                    debug!(worker_idx, "Job sent to worker");
                    return Ok(worker_idx);
                }
                Err(mpsc::error::SendError(returned)) => {
                    warn!(worker_idx, task_id = %returned.task_id, "Worker channel closed, trying next");
                    envelope = returned;
                }
            }
        }

        Err(QueueError::Closed)
    }

    /// Get number of workers
    pub fn num_workers(&self) -> usize {
        self.worker_channels.len()
    }

    /// True when every worker channel is still open
    pub fn health_check(&self) -> bool {
        !self.worker_channels.is_empty() && self.worker_channels.iter().all(|ch| !ch.is_closed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_job(job_id: &str) -> Job {
        Job {
            job_id: job_id.to_string(),
            job_type: "campaign".to_string(),
            urls: vec!["https://example.com/file.mp4".to_string()],
            webhook_url: None,
        }
    }

    #[tokio::test]
    async fn test_broker_enqueue() {
        let (broker, mut receivers) = JobBroker::new(2, 10);

        let worker = broker.enqueue("t1".into(), create_test_job("job1")).await.unwrap();
        assert_eq!(worker, 0);

        let envelope = receivers[0].recv().await.unwrap();
        assert_eq!(envelope.task_id, "t1");
        assert_eq!(envelope.job.job_id, "job1");

        let worker = broker.enqueue("t2".into(), create_test_job("job2")).await.unwrap();
        assert_eq!(worker, 1);
        assert_eq!(receivers[1].recv().await.unwrap().job.job_id, "job2");
    }

    #[tokio::test]
    async fn test_round_robin_distribution() {
        let (broker, mut receivers) = JobBroker::new(3, 10);

        for i in 0..6 {
            broker
                .enqueue(format!("t{i}"), create_test_job(&format!("job{i}")))
                .await
                .unwrap();
        }

        // Worker 0 gets 0 and 3, worker 1 gets 1 and 4, worker 2 gets 2 and 5
        for (worker_id, receiver) in receivers.iter_mut().enumerate() {
            let first = receiver.recv().await.unwrap();
            let second = receiver.recv().await.unwrap();
            assert_eq!(first.task_id, format!("t{worker_id}"));
            assert_eq!(second.task_id, format!("t{}", worker_id + 3));
        }
    }

    #[tokio::test]
    async fn test_closed_worker_is_skipped() {
        let (broker, mut receivers) = JobBroker::new(2, 10);
        drop(receivers.remove(0));

        assert!(!broker.health_check());
        let worker = broker.enqueue("t1".into(), create_test_job("job1")).await.unwrap();

        assert_eq!(worker, 1);
        assert_eq!(receivers[0].recv().await.unwrap().task_id, "t1");
    }

    #[tokio::test]
    async fn test_all_workers_gone() {
        let (broker, receivers) = JobBroker::new(2, 10);
        drop(receivers);

        let err = broker.enqueue("t1".into(), create_test_job("job1")).await.unwrap_err();
        assert_eq!(err, QueueError::Closed);

        let (empty, _) = JobBroker::new(0, 10);
        assert_eq!(
            empty.enqueue("t2".into(), create_test_job("job2")).await.unwrap_err(),
            QueueError::NoWorkers
        );
    }
}
