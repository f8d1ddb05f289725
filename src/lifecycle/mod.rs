//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Build aggregator → Spawn discovery, aggregator, server
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop discovery → Stop aggregator → Drain HTTP → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered shutdown: discovery before HTTP, so no update races the exit
//! - HTTP drain has a deadline: connections are cut after the grace period
//! - No retries: the snapshot is rebuilt from discovery on the next start

pub mod shutdown;
pub mod signals;
pub mod startup;

use std::fmt;

pub use shutdown::Shutdown;
pub use startup::App;

/// Process lifecycle state. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Starting,
    Running,
    Draining,
    Stopped,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Starting => "starting",
            Phase::Running => "running",
            Phase::Draining => "draining",
            Phase::Stopped => "stopped",
        };
        f.write_str(name)
    }
}
