//! Configuration loading from disk.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::schema::Settings;
use crate::config::scrape::{JobConfigs, PrometheusConfig};
use crate::config::validation::{validate_scrape_configs, validate_settings, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", .path.display())]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to parse {}: {source}", .path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn read(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Load and validate settings from a TOML file.
pub fn load_settings(path: &Path) -> Result<Settings, ConfigError> {
    let content = read(path)?;
    parse_settings(&content).map_err(|e| match e {
        ConfigError::Toml { source, .. } => ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        },
        other => other,
    })
}

/// Parse and validate settings from TOML text.
pub fn parse_settings(content: &str) -> Result<Settings, ConfigError> {
    let settings: Settings = toml::from_str(content).map_err(|source| ConfigError::Toml {
        path: PathBuf::from("<inline>"),
        source,
    })?;
    validate_settings(&settings).map_err(ConfigError::Validation)?;
    Ok(settings)
}

/// Load the per-job discovery configuration from a Prometheus-format file.
pub fn load_discovery_config(path: &Path) -> Result<JobConfigs, ConfigError> {
    let content = read(path)?;
    let config: PrometheusConfig = if content.trim().is_empty() {
        PrometheusConfig::default()
    } else {
        serde_yaml::from_str(&content).map_err(|source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        })?
    };
    validate_scrape_configs(&config).map_err(ConfigError::Validation)?;

    let mut jobs = JobConfigs::new();
    for scrape in &config.scrape_configs {
        for kind in scrape.unsupported_discovery() {
            tracing::warn!(
                job = %scrape.job_name,
                kind,
                "Discovery mechanism not supported, job gets no targets from it"
            );
        }
        jobs.insert(scrape.job_name.clone(), scrape.discovery_configs());
    }

    tracing::info!(
        path = %path.display(),
        jobs = jobs.len(),
        "Discovery configuration loaded"
    );
    Ok(jobs)
}
