//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! settings file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → Settings (validated, immutable)
//!
//! discovery file (Prometheus YAML)
//!     → loader.rs → scrape.rs (scrape_configs)
//!     → validation.rs (unique, non-empty job names)
//!     → JobConfigs (job → provider configs)
//! ```
//!
//! # Design Decisions
//! - Both files are read once at startup; any failure is fatal
//! - All settings have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod scrape;
pub mod validation;

pub use loader::{load_discovery_config, load_settings, ConfigError};
pub use schema::{
    DiscoveryConfig, FilterConfig, ListenerConfig, LogFormat, ObservabilityConfig, Settings,
    ShutdownConfig, TimeoutConfig,
};
pub use scrape::{JobConfigs, SdConfig};
