//! kdiscovery
//!
//! Aggregates service discovery target groups per job and serves them as JSON.
//!
//! # Architecture Overview
//!
//! ```text
//!   ┌────────────────────────────────────────────────────────────────┐
//!   │                          KDISCOVERY                            │
//!   │                                                                │
//!   │  ┌──────────────┐   ┌───────────┐   bounded   ┌────────────┐   │
//!   │  │ static / file│──▶│ discovery │───queue────▶│ aggregator │   │
//!   │  │  providers   │   │  manager  │             │ (1 writer) │   │
//!   │  └──────────────┘   └───────────┘             └─────┬──────┘   │
//!   │                                                     │ ArcSwap  │
//!   │                                                     ▼          │
//!   │   GET /  /health  /readiness    ◀──────────── ┌────────────┐   │
//!   │  ◀─────────────────────────────────────────── │    http    │   │
//!   │                                               └────────────┘   │
//!   │                                                                │
//!   │  lifecycle: SIGINT/SIGTERM → stop discovery → drain http       │
//!   └────────────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use kdiscovery::config::{load_discovery_config, load_settings, Settings};
use kdiscovery::lifecycle::{signals, App};
use kdiscovery::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "kdiscovery")]
#[command(about = "Serve discovered scrape targets as JSON", long_about = None)]
struct Cli {
    /// Settings file (TOML). Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Prometheus configuration holding `scrape_configs`.
    #[arg(short, long)]
    discovery_config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut settings = match &cli.config {
        Some(path) => load_settings(path)?,
        None => Settings::default(),
    };
    if let Some(bind) = cli.bind {
        settings.listener.bind_address = bind;
    }
    if let Some(path) = cli.discovery_config {
        settings.discovery.config_path = path;
    }

    logging::init(&settings.observability);
    tracing::info!("kdiscovery v{} starting", env!("CARGO_PKG_VERSION"));

    let jobs = match load_discovery_config(&settings.discovery.config_path) {
        Ok(jobs) => jobs,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load discovery configuration");
            return Err(e.into());
        }
    };

    tracing::info!(
        bind_address = %settings.listener.bind_address,
        excluded_namespace = %settings.filter.excluded_namespace,
        update_interval_ms = settings.discovery.update_interval_ms,
        "Configuration loaded"
    );

    if settings.observability.metrics_enabled {
        match settings.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %settings.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&settings.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    App::new(settings, jobs)
        .run(listener, signals::wait_for_termination())
        .await?;

    tracing::info!("bye");
    Ok(())
}
