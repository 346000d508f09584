/// Fjall-based persistence for task state and results
///
/// Each accepted request gets a [`TaskRecord`] keyed by its `task_id`. The
/// intake marks it `pending`, a worker moves it to `started` and finally to
/// `success` (with the [`crate::pipeline::JobResult`]) or `failure` (with the
/// error message). `GET /tasks/{task_id}` reads it back.
///
/// Records are kept for `retention.job_ttl_days` after their last update and
/// removed by [`FjallStore::prune_expired`].
///
/// ```rust,ignore
/// use zipbox::ledger::FjallStore;
///
/// let store = FjallStore::open("data/ledger")?;
/// store.upsert(&record)?;
/// let record = store.get(&task_id)?;
/// ```
pub mod error;
pub mod models;
pub mod partitions;
pub mod pruning;
pub mod store;

pub use error::{LedgerError, Result};
pub use models::{TaskRecord, TaskState};
pub use pruning::PruneStats;
pub use store::{FjallStore, StoreStats};
