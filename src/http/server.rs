//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with the probe and snapshot handlers
//! - Wire up middleware (tracing, timeout, request metrics)
//! - Serve on a bound listener until shutdown
//! - Drain in-flight requests for a bounded grace period

use std::sync::Arc;
use std::time::Duration;

use axum::{middleware, routing::get, Router};
use hyper_util::rt::{TokioExecutor, TokioIo, TokioTimer};
use hyper_util::server::conn::auto::Builder;
use hyper_util::service::TowerToHyperService;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinSet;
use tokio::time;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::aggregator::Aggregator;
use crate::config::Settings;
use crate::http::handlers;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<Aggregator>,
}

/// Read-only HTTP view of the aggregator.
pub struct ExpositionServer {
    router: Router,
    grace_period: Duration,
}

impl ExpositionServer {
    pub fn new(aggregator: Arc<Aggregator>, settings: &Settings) -> Self {
        let state = AppState { aggregator };
        let router = Self::build_router(settings, state);
        Self {
            router,
            grace_period: settings.shutdown.grace_period(),
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(settings: &Settings, state: AppState) -> Router {
        Router::new()
            .route("/health", get(handlers::health))
            .route("/readiness", get(handlers::readiness))
            .route("/", get(handlers::targets))
            .with_state(state)
            .layer(middleware::from_fn(handlers::track_requests))
            .layer(TimeoutLayer::new(Duration::from_secs(settings.timeouts.request_secs)))
            .layer(TraceLayer::new_for_http())
    }

    /// The fully layered router, for serving elsewhere or testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until `shutdown` fires, then give open requests
    /// the grace period to finish before cutting them off.
    ///
    /// Every connection runs in a task owned by this call, so none of them
    /// outlives it.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let (drain_tx, drain_rx) = watch::channel(());
        let mut connections = JoinSet::new();

        loop {
            let stream = tokio::select! {
                _ = shutdown.recv() => break,
                result = listener.accept() => match result {
                    Ok((stream, _)) => stream,
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to accept connection");
                        continue;
                    }
                },
                // Reap finished connections.
                Some(_) = connections.join_next(), if !connections.is_empty() => continue,
            };

            let service = TowerToHyperService::new(self.router.clone());
            let mut drain = drain_rx.clone();
            connections.spawn(async move {
                let mut builder = Builder::new(TokioExecutor::new());
                builder.http1().timer(TokioTimer::new());
                let conn = builder.serve_connection_with_upgrades(TokioIo::new(stream), service);
                tokio::pin!(conn);

                let result = tokio::select! {
                    result = conn.as_mut() => result,
                    _ = drain.changed() => {
                        conn.as_mut().graceful_shutdown();
                        conn.as_mut().await
                    }
                };
                if let Err(e) = result {
                    tracing::debug!(error = %e, "Connection closed with error");
                }
            });
        }
        drop(listener);

        tracing::info!(
            grace_period = ?self.grace_period,
            connections = connections.len(),
            "Draining HTTP connections"
        );
        let _ = drain_tx.send(());
        let drained = time::timeout(self.grace_period, async {
            while connections.join_next().await.is_some() {}
        })
        .await;
        if drained.is_err() {
            tracing::warn!(
                connections = connections.len(),
                "Grace period elapsed, closing remaining connections"
            );
            connections.shutdown().await;
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
