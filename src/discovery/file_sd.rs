//! File based discovery from `file_sd_configs`.
//!
//! Each file holds a list of `{"targets": [...], "labels": {...}}` entries in
//! JSON (`.json`) or YAML (`.yml`, `.yaml`). Entries in `files` may use glob
//! patterns in their last path element (`/etc/targets/*.json`); patterns are
//! expanded on every refresh. Files are re-read whenever their directory
//! reports a change and on every refresh interval.

use std::collections::{BTreeMap, BTreeSet};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use tokio::time;

use crate::config::scrape::FileSdConfig;
use crate::discovery::{Discoverer, StaticGroup, TargetGroup, UpdateSender};
use crate::observability::metrics;

/// Label added to every group read from a file.
pub const FILEPATH_LABEL: &str = "__meta_filepath";

#[derive(Debug, Error)]
pub enum FileSdError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {} as JSON: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to parse {} as YAML: {source}", .path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("unsupported file format for {}, expected .json, .yml or .yaml", .path.display())]
    UnsupportedFormat { path: PathBuf },
}

impl FileSdError {
    fn is_not_found(&self) -> bool {
        matches!(self, FileSdError::Io { source, .. } if source.kind() == ErrorKind::NotFound)
    }
}

/// Read and decode one target file.
pub async fn read_file(path: &Path) -> Result<Vec<TargetGroup>, FileSdError> {
    let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or_default();
    if !matches!(extension, "json" | "yml" | "yaml") {
        return Err(FileSdError::UnsupportedFormat {
            path: path.to_path_buf(),
        });
    }

    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| FileSdError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    let entries: Vec<StaticGroup> = if extension == "json" {
        serde_json::from_str(&content).map_err(|source| FileSdError::Json {
            path: path.to_path_buf(),
            source,
        })?
    } else if content.trim().is_empty() {
        Vec::new()
    } else {
        serde_yaml::from_str(&content).map_err(|source| FileSdError::Yaml {
            path: path.to_path_buf(),
            source,
        })?
    };

    let display = path.display().to_string();
    Ok(entries
        .into_iter()
        .enumerate()
        .map(|(i, entry)| {
            let mut group = entry.into_target_group(format!("{display}:{i}"));
            group.labels.insert(FILEPATH_LABEL.to_string(), display.clone());
            group
        })
        .collect())
}

pub struct FileDiscovery {
    config: FileSdConfig,
    /// Last successfully read groups per file.
    contents: BTreeMap<PathBuf, Vec<TargetGroup>>,
    published: Option<Vec<TargetGroup>>,
}

impl FileDiscovery {
    pub fn new(config: FileSdConfig) -> Self {
        Self {
            config,
            contents: BTreeMap::new(),
            published: None,
        }
    }

    /// Expand the configured patterns into the files currently matching
    /// them, in configuration order and sorted within each pattern.
    fn expand(&self) -> Vec<PathBuf> {
        let mut seen = BTreeSet::new();
        let mut paths = Vec::new();
        for pattern in &self.config.files {
            let Some(pattern) = pattern.to_str() else {
                tracing::warn!(pattern = %pattern.display(), "Target file pattern is not valid UTF-8");
                continue;
            };
            match glob::glob(pattern) {
                Ok(matches) => {
                    for entry in matches {
                        match entry {
                            Ok(path) => {
                                if seen.insert(path.clone()) {
                                    paths.push(path);
                                }
                            }
                            Err(e) => tracing::warn!(error = %e, "Failed to expand target file pattern"),
                        }
                    }
                }
                Err(e) => tracing::warn!(pattern, error = %e, "Invalid target file pattern"),
            }
        }
        paths
    }

    /// Re-read every matching file. Returns the merged group list if it
    /// differs from what was last published.
    pub async fn refresh(&mut self) -> Option<Vec<TargetGroup>> {
        let paths = self.expand();
        self.contents.retain(|path, _| {
            let matched = paths.contains(path);
            if !matched {
                tracing::info!(path = %path.display(), "Target file removed");
            }
            matched
        });

        for path in &paths {
            match read_file(path).await {
                Ok(groups) => {
                    self.contents.insert(path.clone(), groups);
                }
                Err(e) if e.is_not_found() => {
                    if self.contents.remove(path).is_some() {
                        tracing::info!(path = %path.display(), "Target file removed");
                    }
                }
                Err(e) => {
                    metrics::record_file_sd_failure();
                    tracing::warn!(error = %e, "Failed to refresh target file, keeping previous targets");
                }
            }
        }

        let merged: Vec<TargetGroup> = paths
            .iter()
            .filter_map(|path| self.contents.get(path))
            .flatten()
            .cloned()
            .collect();

        if self.published.as_ref() == Some(&merged) {
            return None;
        }
        self.published = Some(merged.clone());
        Some(merged)
    }

    /// Watch the directories holding the target files.
    fn watch(&self, tx: mpsc::Sender<()>) -> Result<RecommendedWatcher, notify::Error> {
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() || event.kind.is_remove() {
                        let _ = tx.try_send(());
                    }
                }
                Err(e) => tracing::error!(error = ?e, "Target file watch error"),
            },
            notify::Config::default(),
        )?;

        let dirs: BTreeSet<PathBuf> = self
            .config
            .files
            .iter()
            .map(|path| match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => PathBuf::from("."),
            })
            .collect();
        for dir in &dirs {
            watcher.watch(dir, RecursiveMode::NonRecursive)?;
        }

        Ok(watcher)
    }
}

impl Discoverer for FileDiscovery {
    fn run(
        mut self: Box<Self>,
        updates: UpdateSender,
        mut shutdown: broadcast::Receiver<()>,
    ) -> BoxFuture<'static, ()> {
        async move {
            let (changed_tx, mut changed_rx) = mpsc::channel(1);
            let _watcher = match self.watch(changed_tx) {
                Ok(watcher) => Some(watcher),
                Err(e) => {
                    tracing::warn!(
                        job = %updates.job(),
                        error = %e,
                        "Cannot watch target files, relying on refresh interval"
                    );
                    None
                }
            };

            tracing::debug!(
                job = %updates.job(),
                files = self.config.files.len(),
                refresh_interval = ?self.config.refresh_interval,
                "File discovery starting"
            );

            let mut ticker = time::interval(self.config.refresh_interval);
            loop {
                tokio::select! {
                    _ = shutdown.recv() => break,
                    _ = ticker.tick() => {}
                    Some(()) = changed_rx.recv() => {}
                }

                if let Some(groups) = self.refresh().await {
                    if !updates.send(groups).await {
                        break;
                    }
                }
            }
        }
        .boxed()
    }
}
