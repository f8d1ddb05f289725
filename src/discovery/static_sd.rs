//! Static target lists from `static_configs`.

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use tokio::sync::broadcast;

use crate::discovery::{Discoverer, StaticGroup, TargetGroup, UpdateSender};

/// Publishes a fixed set of groups once, then idles until shutdown.
pub struct StaticDiscovery {
    groups: Vec<TargetGroup>,
}

impl StaticDiscovery {
    pub fn new(groups: Vec<StaticGroup>) -> Self {
        let groups = groups
            .into_iter()
            .enumerate()
            .map(|(i, group)| group.into_target_group(i.to_string()))
            .collect();
        Self { groups }
    }
}

impl Discoverer for StaticDiscovery {
    fn run(
        self: Box<Self>,
        updates: UpdateSender,
        mut shutdown: broadcast::Receiver<()>,
    ) -> BoxFuture<'static, ()> {
        async move {
            tracing::debug!(job = %updates.job(), groups = self.groups.len(), "Static discovery publishing");
            tokio::select! {
                _ = shutdown.recv() => return,
                sent = updates.send(self.groups) => {
                    if !sent {
                        return;
                    }
                }
            }
            let _ = shutdown.recv().await;
        }
        .boxed()
    }
}
