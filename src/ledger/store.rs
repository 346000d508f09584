use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle};
use tracing::{debug, info};

use super::error::Result;
use super::models::{TaskRecord, TaskState};
use super::partitions::{JOBS_PARTITION, METADATA_PARTITION, encode_job_key, encode_meta_key};
use super::pruning::{META_LAST_PRUNE_JOBS, PruneStats, prune_expired};

/// Fjall-backed persistent storage for task records
#[derive(Clone)]
pub struct FjallStore {
    keyspace: Keyspace,
    jobs: PartitionHandle,
    metadata: PartitionHandle,
}

impl FjallStore {
    /// Open or create a Fjall store at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening Fjall store at: {}", path.display());

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let keyspace = Config::new(path).open()?;
        let jobs = keyspace.open_partition(JOBS_PARTITION, PartitionCreateOptions::default())?;
        let metadata =
            keyspace.open_partition(METADATA_PARTITION, PartitionCreateOptions::default())?;

        info!("Fjall store opened successfully");
        Ok(Self {
            keyspace,
            jobs,
            metadata,
        })
    }

    /// Store or replace a task record
    pub fn upsert(&self, record: &TaskRecord) -> Result<()> {
        let key = encode_job_key(&record.task_id);
        let value = serde_json::to_vec(record)?;
        self.jobs.insert(key, value)?;
        debug!(task_id = %record.task_id, status = ?record.status, "Upserted task");
        Ok(())
    }

    /// Get a task record by ID
    pub fn get(&self, task_id: &str) -> Result<Option<TaskRecord>> {
        let key = encode_job_key(task_id);
        match self.jobs.get(key)? {
            Some(value) => Ok(Some(serde_json::from_slice(&value)?)),
            None => Ok(None),
        }
    }

    /// Drop records not updated within `ttl`
    pub fn prune_expired(&self, ttl: Duration) -> Result<PruneStats> {
        prune_expired(&self.jobs, &self.metadata, ttl, Utc::now())
    }

    /// When [`FjallStore::prune_expired`] last ran
    pub fn last_pruned_at(&self) -> Result<Option<DateTime<Utc>>> {
        let Some(value) = self.metadata.get(encode_meta_key(META_LAST_PRUNE_JOBS))? else {
            return Ok(None);
        };
        Ok(std::str::from_utf8(&value)
            .ok()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|t| t.with_timezone(&Utc)))
    }

    /// Persist all pending writes to disk
    pub fn persist(&self) -> Result<()> {
        self.keyspace.persist(fjall::PersistMode::SyncAll)?;
        Ok(())
    }

    /// Count records by state (for debugging/monitoring)
    pub fn stats(&self) -> Result<StoreStats> {
        let mut stats = StoreStats::default();

        for item in self.jobs.iter() {
            let (_, value) = item?;
            let record: TaskRecord = serde_json::from_slice(&value)?;
            stats.task_count += 1;
            match record.status {
                TaskState::Pending => stats.pending += 1,
                TaskState::Started => stats.started += 1,
                TaskState::Success => stats.succeeded += 1,
                TaskState::Failure => stats.failed += 1,
            }
        }

        Ok(stats)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub task_count: usize,
    pub pending: usize,
    pub started: usize,
    pub succeeded: usize,
    pub failed: usize,
}
