//! Discovery manager.
//!
//! # Responsibilities
//! - Start one task per configured provider
//! - Keep the latest output of every provider, grouped by job
//! - Emit throttled [`UpdateBatch`]es for the jobs that changed
//! - Stop every provider on shutdown
//!
//! # Design Decisions
//! - Emission uses `try_send` on a bounded queue. When the aggregator is
//!   behind, changed jobs stay pending and go out with the next tick, so a
//!   slow consumer sees fewer, newer batches instead of an unbounded backlog.
//! - A batch always carries the full merged list for each job it names.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinSet;
use tokio::time::{self, MissedTickBehavior};

use crate::config::scrape::JobConfigs;
use crate::discovery::{ProviderUpdate, TargetGroup, UpdateBatch, UpdateSender};
use crate::lifecycle::Shutdown;
use crate::observability::metrics;

/// Capacity of the queue between providers and the manager.
const PROVIDER_QUEUE: usize = 64;

pub struct DiscoveryManager {
    jobs: JobConfigs,
    update_interval: Duration,
    /// job → provider index → latest groups.
    targets: BTreeMap<String, BTreeMap<usize, Vec<TargetGroup>>>,
    pending: BTreeSet<String>,
}

impl DiscoveryManager {
    pub fn new(jobs: JobConfigs, update_interval: Duration) -> Self {
        Self {
            jobs,
            update_interval,
            targets: BTreeMap::new(),
            pending: BTreeSet::new(),
        }
    }

    /// Record a provider's output and mark its job as changed.
    pub fn apply(&mut self, update: ProviderUpdate) {
        tracing::trace!(
            job = %update.job,
            provider = update.provider,
            groups = update.groups.len(),
            "Provider update received"
        );
        self.targets
            .entry(update.job.clone())
            .or_default()
            .insert(update.provider, update.groups);
        self.pending.insert(update.job);
    }

    /// Full merged state of every changed job. Does not clear the pending set.
    pub fn pending_batch(&self) -> UpdateBatch {
        self.pending
            .iter()
            .map(|job| {
                let groups = self
                    .targets
                    .get(job)
                    .map(|providers| providers.values().flatten().cloned().collect())
                    .unwrap_or_default();
                (job.clone(), groups)
            })
            .collect()
    }

    /// Try to hand the pending jobs to the aggregator.
    ///
    /// Returns `false` once the receiving side is gone.
    pub fn flush(&mut self, batches: &mpsc::Sender<UpdateBatch>) -> bool {
        if self.pending.is_empty() {
            return true;
        }

        match batches.try_send(self.pending_batch()) {
            Ok(()) => {
                tracing::debug!(jobs = self.pending.len(), "Update batch emitted");
                self.pending.clear();
                true
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                metrics::record_batch_deferred();
                tracing::debug!(
                    jobs = self.pending.len(),
                    "Aggregator is behind, deferring update batch"
                );
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    /// Run all providers until `shutdown` fires.
    pub async fn run(
        mut self,
        batches: mpsc::Sender<UpdateBatch>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        let providers = Shutdown::new();
        let (tx, mut rx) = mpsc::channel(PROVIDER_QUEUE);
        let mut tasks = JoinSet::new();

        for (job, configs) in &self.jobs {
            for (index, config) in configs.iter().enumerate() {
                let sender = UpdateSender::new(job.clone(), index, tx.clone());
                tasks.spawn(config.build().run(sender, providers.subscribe()));
            }
        }
        drop(tx);

        tracing::info!(
            jobs = self.jobs.len(),
            providers = tasks.len(),
            "Discovery manager started"
        );

        let mut ticker = time::interval(self.update_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.recv() => break,
                Some(update) = rx.recv() => self.apply(update),
                _ = ticker.tick() => {
                    if !self.flush(&batches) {
                        tracing::info!("Batch receiver closed, stopping discovery");
                        break;
                    }
                }
            }
        }

        providers.trigger();
        drop(rx);
        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                tracing::error!(error = %e, "Discovery provider task failed");
            }
        }
        tracing::info!("Discovery manager stopped");
    }
}
