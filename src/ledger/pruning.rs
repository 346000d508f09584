/// Retention for task records
use chrono::{DateTime, TimeDelta, Utc};
use fjall::PartitionHandle;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::error::Result;
use super::models::TaskRecord;
use super::partitions::{decode_job_key, encode_meta_key};

/// Metadata key holding the last prune time (RFC 3339)
pub const META_LAST_PRUNE_JOBS: &str = "last_prune_jobs";

/// Pruning statistics
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PruneStats {
    pub scanned: usize,
    pub jobs_pruned: usize,
}

/// Remove task records whose `updated_at` is older than `ttl` at `now`.
///
/// Records that fail to decode are left in place.
pub fn prune_expired(
    jobs_partition: &PartitionHandle,
    metadata_partition: &PartitionHandle,
    ttl: Duration,
    now: DateTime<Utc>,
) -> Result<PruneStats> {
    let mut stats = PruneStats::default();

    let cutoff = TimeDelta::from_std(ttl)
        .ok()
        .and_then(|ttl| now.checked_sub_signed(ttl));

    if let Some(cutoff) = cutoff {
        let mut expired = Vec::new();

        for item in jobs_partition.iter() {
            let (key, value) = item?;
            stats.scanned += 1;

            match serde_json::from_slice::<TaskRecord>(&value) {
                Ok(record) if record.updated_at < cutoff => expired.push(key),
                Ok(_) => {}
                Err(e) => {
                    let task_id = decode_job_key(&key).unwrap_or_default();
                    warn!(%task_id, error = %e, "Skipping undecodable task record");
                }
            }
        }

        for key in expired {
            debug!(task_id = %decode_job_key(&key).unwrap_or_default(), "Pruning task record");
            jobs_partition.remove(key)?;
            stats.jobs_pruned += 1;
        }
    }

    metadata_partition.insert(
        encode_meta_key(META_LAST_PRUNE_JOBS),
        now.to_rfc3339().as_bytes(),
    )?;

    info!(
        scanned = stats.scanned,
        pruned = stats.jobs_pruned,
        "Pruned expired task records"
    );
    Ok(stats)
}
