//! Service discovery subsystem.
//!
//! # Data Flow
//! ```text
//! scrape config (job → provider configs)
//!     → static_sd.rs / file_sd.rs (one task per provider)
//!     → manager.rs (merge per job, coalesce, throttle)
//!     → UpdateBatch over a bounded channel
//!     → aggregator
//! ```
//!
//! # Design Decisions
//! - Providers always send their full current group list, never deltas
//! - The manager only emits jobs that changed since the last emission
//! - Backend errors stay inside the provider that hit them

pub mod file_sd;
pub mod manager;
pub mod static_sd;
pub mod target;

use std::collections::BTreeMap;

use futures_util::future::BoxFuture;
use tokio::sync::{broadcast, mpsc};

use crate::config::scrape::SdConfig;

pub use manager::DiscoveryManager;
pub use target::{LabelSet, StaticGroup, TargetGroup, ADDRESS_LABEL};

/// Full current state for every job it names. Jobs with an empty list are
/// to be removed.
pub type UpdateBatch = BTreeMap<String, Vec<TargetGroup>>;

/// A source of target groups for one job.
pub trait Discoverer: Send {
    /// Run until `shutdown` fires. Every message sent through `updates` is the
    /// provider's complete current list of groups.
    fn run(
        self: Box<Self>,
        updates: UpdateSender,
        shutdown: broadcast::Receiver<()>,
    ) -> BoxFuture<'static, ()>;
}

/// Output of a single provider, tagged with where it came from.
#[derive(Debug)]
pub struct ProviderUpdate {
    pub job: String,
    pub provider: usize,
    pub groups: Vec<TargetGroup>,
}

/// Handle given to a provider for publishing its groups.
#[derive(Debug, Clone)]
pub struct UpdateSender {
    job: String,
    provider: usize,
    tx: mpsc::Sender<ProviderUpdate>,
}

impl UpdateSender {
    pub fn new(job: impl Into<String>, provider: usize, tx: mpsc::Sender<ProviderUpdate>) -> Self {
        Self {
            job: job.into(),
            provider,
            tx,
        }
    }

    pub fn job(&self) -> &str {
        &self.job
    }

    /// Publish the provider's groups. Returns `false` once the manager is gone.
    pub async fn send(&self, groups: Vec<TargetGroup>) -> bool {
        self.tx
            .send(ProviderUpdate {
                job: self.job.clone(),
                provider: self.provider,
                groups,
            })
            .await
            .is_ok()
    }
}

impl SdConfig {
    /// Instantiate the provider described by this config.
    pub fn build(&self) -> Box<dyn Discoverer> {
        match self {
            SdConfig::Static(groups) => Box::new(static_sd::StaticDiscovery::new(groups.clone())),
            SdConfig::File(config) => Box::new(file_sd::FileDiscovery::new(config.clone())),
        }
    }
}
