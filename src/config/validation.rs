//! Configuration validation.
//!
//! Serde handles syntax; this module checks values. Every check runs and all
//! failures are returned together.

use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::path::Path;

use thiserror::Error;

use crate::config::scrape::PrometheusConfig;
use crate::config::schema::Settings;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid {field} {value:?}: expected host:port")]
    InvalidAddress { field: &'static str, value: String },
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },
    #[error("{field} must not be empty")]
    Empty { field: &'static str },
    #[error("scrape config at index {index} has an empty job_name")]
    EmptyJobName { index: usize },
    #[error("duplicate job_name {0:?}")]
    DuplicateJob(String),
    #[error("job {job:?}: file_sd_configs entry {index} lists no files")]
    NoFiles { job: String, index: usize },
    #[error("job {job:?}: file_sd_configs entry {index} has a zero refresh_interval")]
    ZeroRefresh { job: String, index: usize },
    #[error(
        "job {job:?}: invalid file_sd_configs pattern {pattern:?}: expected a .json, .yml or .yaml \
         file name with wildcards only in the last path element"
    )]
    InvalidFilePattern { job: String, pattern: String },
}

/// `host:port` where host is non-empty. Names are resolved at bind time.
fn is_host_port(value: &str) -> bool {
    if value.parse::<SocketAddr>().is_ok() {
        return true;
    }
    match value.rsplit_once(':') {
        Some((host, port)) => !host.is_empty() && !host.contains(':') && port.parse::<u16>().is_ok(),
        None => false,
    }
}

/// A target file pattern: a valid glob, wildcards only in the file name and a
/// supported extension.
fn is_file_pattern(pattern: &Path) -> bool {
    let Some(text) = pattern.to_str() else {
        return false;
    };
    if glob::Pattern::new(text).is_err() {
        return false;
    }
    let wildcard_dir = pattern
        .parent()
        .and_then(Path::to_str)
        .is_some_and(|dir| dir.contains(['*', '?', '[']));
    let extension = pattern.extension().and_then(|ext| ext.to_str());
    !wildcard_dir && matches!(extension, Some("json" | "yml" | "yaml"))
}

/// Validate process settings.
pub fn validate_settings(settings: &Settings) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if !is_host_port(&settings.listener.bind_address) {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: settings.listener.bind_address.clone(),
        });
    }
    if settings.observability.metrics_enabled
        && settings.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: settings.observability.metrics_address.clone(),
        });
    }
    if settings.discovery.update_interval_ms == 0 {
        errors.push(ValidationError::Zero {
            field: "discovery.update_interval_ms",
        });
    }
    if settings.discovery.channel_capacity == 0 {
        errors.push(ValidationError::Zero {
            field: "discovery.channel_capacity",
        });
    }
    if settings.timeouts.request_secs == 0 {
        errors.push(ValidationError::Zero {
            field: "timeouts.request_secs",
        });
    }
    if settings.filter.namespace_label.is_empty() {
        errors.push(ValidationError::Empty {
            field: "filter.namespace_label",
        });
    }
    if settings.filter.excluded_namespace.is_empty() {
        errors.push(ValidationError::Empty {
            field: "filter.excluded_namespace",
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate the discovery configuration.
pub fn validate_scrape_configs(config: &PrometheusConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mut seen = BTreeSet::new();

    for (index, scrape) in config.scrape_configs.iter().enumerate() {
        if scrape.job_name.is_empty() {
            errors.push(ValidationError::EmptyJobName { index });
        } else if !seen.insert(scrape.job_name.as_str()) {
            errors.push(ValidationError::DuplicateJob(scrape.job_name.clone()));
        }

        for (i, file_sd) in scrape.file_sd_configs.iter().enumerate() {
            if file_sd.files.is_empty() {
                errors.push(ValidationError::NoFiles {
                    job: scrape.job_name.clone(),
                    index: i,
                });
            }
            for pattern in &file_sd.files {
                if !is_file_pattern(pattern) {
                    errors.push(ValidationError::InvalidFilePattern {
                        job: scrape.job_name.clone(),
                        pattern: pattern.display().to_string(),
                    });
                }
            }
            if file_sd.refresh_interval.is_zero() {
                errors.push(ValidationError::ZeroRefresh {
                    job: scrape.job_name.clone(),
                    index: i,
                });
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_are_valid() {
        assert!(validate_settings(&Settings::default()).is_ok());
    }

    #[test]
    fn collects_every_error() {
        let mut settings = Settings::default();
        settings.listener.bind_address = ":8080".into();
        settings.discovery.channel_capacity = 0;
        settings.filter.excluded_namespace.clear();

        let errors = validate_settings(&settings).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.contains(&ValidationError::Zero {
            field: "discovery.channel_capacity"
        }));
    }

    #[test]
    fn metrics_address_checked_only_when_enabled() {
        let mut settings = Settings::default();
        settings.observability.metrics_address = "nope".into();
        assert!(validate_settings(&settings).is_ok());

        settings.observability.metrics_enabled = true;
        assert!(validate_settings(&settings).is_err());
    }

    #[test]
    fn rejects_duplicate_and_empty_jobs() {
        let config: PrometheusConfig = serde_yaml::from_str(
            r#"
scrape_configs:
  - job_name: node
  - job_name: node
  - job_name: ""
  - job_name: files
    file_sd_configs:
      - files: []
      - files: ['a.json']
        refresh_interval: 0s
"#,
        )
        .unwrap();

        let errors = validate_scrape_configs(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::DuplicateJob("node".into()),
                ValidationError::EmptyJobName { index: 2 },
                ValidationError::NoFiles {
                    job: "files".into(),
                    index: 0
                },
                ValidationError::ZeroRefresh {
                    job: "files".into(),
                    index: 1
                },
            ]
        );
    }

    #[test]
    fn bind_address_accepts_host_names() {
        let mut settings = Settings::default();
        for valid in ["localhost:8080", "127.0.0.1:0", "[::1]:8080"] {
            settings.listener.bind_address = valid.into();
            assert!(validate_settings(&settings).is_ok(), "{valid}");
        }
        for invalid in ["localhost", "localhost:99999", ":8080", "::1:8080"] {
            settings.listener.bind_address = invalid.into();
            assert!(validate_settings(&settings).is_err(), "{invalid}");
        }
    }

    #[test]
    fn file_patterns_must_name_target_files() {
        let config: PrometheusConfig = serde_yaml::from_str(
            r#"
scrape_configs:
  - job_name: files
    file_sd_configs:
      - files: ['targets/*.json', 'a.yml', 'b.yaml']
      - files: ['targets/*/a.json', 'targets.txt', '[bad.json']
"#,
        )
        .unwrap();

        let errors = validate_scrape_configs(&config).unwrap_err();
        let patterns: Vec<_> = errors
            .iter()
            .map(|e| match e {
                ValidationError::InvalidFilePattern { pattern, .. } => pattern.as_str(),
                other => panic!("unexpected error {other}"),
            })
            .collect();
        assert_eq!(patterns, ["targets/*/a.json", "targets.txt", "[bad.json"]);
    }
}
