//! Startup and shutdown orchestration.
//!
//! # Responsibilities
//! - Build the aggregator, batch queue and discovery manager
//! - Run discovery, aggregation and the HTTP server concurrently
//! - On termination, stop discovery first, then drain HTTP
//!
//! # Design Decisions
//! - Fail fast: configuration problems surface before `App` exists
//! - The listener is bound by the caller, so probes answer as soon as
//!   `run` starts serving
//! - Two shutdown stages, so no batch is applied after draining begins

use std::future::Future;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tokio::time;

use crate::aggregator::{Aggregator, NamespaceFilter};
use crate::config::scrape::JobConfigs;
use crate::config::Settings;
use crate::discovery::DiscoveryManager;
use crate::http::ExpositionServer;
use crate::lifecycle::{Phase, Shutdown};

/// The assembled process.
pub struct App {
    settings: Settings,
    jobs: JobConfigs,
    aggregator: Arc<Aggregator>,
    phase: watch::Sender<Phase>,
}

impl App {
    pub fn new(settings: Settings, jobs: JobConfigs) -> Self {
        let aggregator = Arc::new(Aggregator::new(NamespaceFilter::from_config(&settings.filter)));
        let (phase, _) = watch::channel(Phase::Starting);
        Self {
            settings,
            jobs,
            aggregator,
            phase,
        }
    }

    pub fn aggregator(&self) -> Arc<Aggregator> {
        self.aggregator.clone()
    }

    /// Observe lifecycle transitions.
    pub fn phase(&self) -> watch::Receiver<Phase> {
        self.phase.subscribe()
    }

    fn enter(&self, phase: Phase) {
        tracing::info!(phase = %phase, "Lifecycle transition");
        self.phase.send_replace(phase);
    }

    /// Run until `terminate` resolves, then drain and stop.
    pub async fn run<F>(self, listener: TcpListener, terminate: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()>,
    {
        let discovery_shutdown = Shutdown::new();
        let server_shutdown = Shutdown::new();
        let (batches_tx, batches_rx) = mpsc::channel(self.settings.discovery.channel_capacity);

        let manager = DiscoveryManager::new(
            self.jobs.clone(),
            self.settings.discovery.update_interval(),
        );
        let server = ExpositionServer::new(self.aggregator.clone(), &self.settings);

        let mut discovery_task =
            tokio::spawn(manager.run(batches_tx, discovery_shutdown.subscribe()));
        let aggregator_task = tokio::spawn(
            self.aggregator
                .clone()
                .run(batches_rx, discovery_shutdown.subscribe()),
        );
        let mut server_task = tokio::spawn(server.run(listener, server_shutdown.subscribe()));
        self.enter(Phase::Running);

        let mut server_result = None;
        tokio::select! {
            _ = terminate => {}
            result = &mut server_task => {
                tracing::error!("HTTP server exited unexpectedly");
                server_result = Some(result);
            }
        }

        self.enter(Phase::Draining);

        discovery_shutdown.trigger();
        let timeout = self.settings.shutdown.discovery_timeout();
        if time::timeout(timeout, &mut discovery_task).await.is_err() {
            tracing::warn!(timeout = ?timeout, "Discovery did not stop in time, aborting");
            discovery_task.abort();
        }
        if let Err(e) = aggregator_task.await {
            tracing::error!(error = %e, "Aggregator task failed");
        }

        server_shutdown.trigger();
        let server_result = match server_result {
            Some(result) => result,
            None => server_task.await,
        };

        self.enter(Phase::Stopped);

        match server_result {
            Ok(result) => result,
            Err(e) => Err(std::io::Error::other(e)),
        }
    }
}
