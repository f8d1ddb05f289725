//! Target aggregation subsystem.
//!
//! # Data Flow
//! ```text
//! UpdateBatch (from discovery manager)
//!     → filter.rs (drop reserved namespace targets)
//!     → copy-on-write Snapshot
//!     → ArcSwap store
//!     → readers (HTTP handlers) load Arc<Snapshot>
//! ```
//!
//! # Design Decisions
//! - Exactly one writer: the task running [`Aggregator::run`]
//! - Readers never block the writer and never see a partially applied batch
//! - A whole batch becomes visible at once, not job by job

pub mod filter;
pub mod snapshot;

use std::sync::Arc;

use arc_swap::ArcSwap;
use tokio::sync::{broadcast, mpsc};

use crate::discovery::UpdateBatch;
use crate::observability::metrics;

pub use filter::NamespaceFilter;
pub use snapshot::Snapshot;

/// Owner of the current [`Snapshot`].
pub struct Aggregator {
    snapshot: ArcSwap<Snapshot>,
    filter: NamespaceFilter,
}

impl Aggregator {
    pub fn new(filter: NamespaceFilter) -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(Snapshot::default()),
            filter,
        }
    }

    /// Current state. The returned view never changes.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot.load_full()
    }

    /// Replace the entries of every job named in `batch`.
    ///
    /// Jobs whose groups are all filtered out are removed. Must only be called
    /// from a single task at a time.
    pub fn apply_batch(&self, batch: UpdateBatch) {
        let mut next = Snapshot::clone(&self.snapshot.load());
        let jobs = batch.len();
        let mut dropped = 0;

        for (job, groups) in batch {
            let (kept, excluded) = self.filter.apply(groups);
            dropped += excluded;
            tracing::debug!(
                job = %job,
                groups = kept.len(),
                excluded,
                "Applying job update"
            );
            next.replace(job, kept);
        }

        metrics::record_batch_applied(jobs, dropped);
        metrics::record_snapshot(next.len(), next.group_count(), next.target_count());
        self.snapshot.store(Arc::new(next));
    }

    /// Apply batches in arrival order until shutdown or until the sender is
    /// dropped.
    pub async fn run(
        self: Arc<Self>,
        mut batches: mpsc::Receiver<UpdateBatch>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        tracing::info!("Aggregator started");
        loop {
            tokio::select! {
                biased;
                _ = shutdown.recv() => break,
                batch = batches.recv() => match batch {
                    Some(batch) => self.apply_batch(batch),
                    None => break,
                },
            }
        }
        tracing::info!(jobs = self.snapshot.load().len(), "Aggregator stopped");
    }
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new(NamespaceFilter::default())
    }
}
