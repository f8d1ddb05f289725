//! kdiscovery: service discovery snapshot aggregator.
//!
//! Runs Prometheus-style discovery for a set of jobs, removes targets from the
//! reserved namespace and serves the result as JSON.

pub mod aggregator;
pub mod config;
pub mod discovery;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use aggregator::{Aggregator, Snapshot};
pub use config::Settings;
pub use http::ExpositionServer;
pub use lifecycle::{App, Phase, Shutdown};
