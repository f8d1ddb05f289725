//! HTTP exposition subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → handlers.rs (probes, snapshot)
//!     → aggregator.snapshot() → JSON
//!     → Send to client
//! ```

pub mod handlers;
pub mod server;

pub use server::{AppState, ExpositionServer};
