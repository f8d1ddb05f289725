//! Discovery configuration in Prometheus `scrape_configs` format.
//!
//! Only the parts that drive discovery are read: `job_name`,
//! `static_configs` and `file_sd_configs`. Everything else in the file is
//! ignored.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::discovery::StaticGroup;

/// Job name → the providers feeding it.
pub type JobConfigs = BTreeMap<String, Vec<SdConfig>>;

/// Root of a Prometheus configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PrometheusConfig {
    #[serde(default)]
    pub scrape_configs: Vec<ScrapeConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScrapeConfig {
    pub job_name: String,

    #[serde(default)]
    pub static_configs: Vec<StaticGroup>,

    #[serde(default)]
    pub file_sd_configs: Vec<FileSdConfig>,

    /// Remaining keys, kept so unsupported discovery mechanisms can be reported.
    #[serde(flatten)]
    pub other: BTreeMap<String, serde_yaml::Value>,
}

impl ScrapeConfig {
    /// Names of `*_sd_configs` sections this process cannot run.
    pub fn unsupported_discovery(&self) -> impl Iterator<Item = &str> {
        self.other
            .keys()
            .map(String::as_str)
            .filter(|key| key.ends_with("_sd_configs"))
    }

    /// Providers for this job, static first.
    pub fn discovery_configs(&self) -> Vec<SdConfig> {
        let mut configs = Vec::with_capacity(self.file_sd_configs.len() + 1);
        if !self.static_configs.is_empty() {
            configs.push(SdConfig::Static(self.static_configs.clone()));
        }
        configs.extend(self.file_sd_configs.iter().cloned().map(SdConfig::File));
        configs
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FileSdConfig {
    pub files: Vec<PathBuf>,

    #[serde(default = "default_refresh_interval", with = "humantime_serde")]
    pub refresh_interval: Duration,
}

fn default_refresh_interval() -> Duration {
    Duration::from_secs(300)
}

/// Configuration of a single discovery provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SdConfig {
    Static(Vec<StaticGroup>),
    File(FileSdConfig),
}
