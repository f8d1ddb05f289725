//! Reserved namespace exclusion.

use crate::config::schema::FilterConfig;
use crate::discovery::{LabelSet, TargetGroup};

/// Drops targets whose namespace label names the reserved namespace.
#[derive(Debug, Clone)]
pub struct NamespaceFilter {
    label: String,
    namespace: String,
}

impl NamespaceFilter {
    pub fn new(label: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            namespace: namespace.into(),
        }
    }

    pub fn from_config(config: &FilterConfig) -> Self {
        Self::new(&config.namespace_label, &config.excluded_namespace)
    }

    /// Whether `target`, a member of `group`, belongs to the reserved namespace.
    pub fn is_excluded(&self, group: &TargetGroup, target: &LabelSet) -> bool {
        group.effective_label(target, &self.label) == Some(self.namespace.as_str())
    }

    /// Filter a job's groups. Returns the surviving groups and the number of
    /// targets dropped.
    ///
    /// Groups left without targets are removed. Order is preserved.
    pub fn apply(&self, groups: Vec<TargetGroup>) -> (Vec<TargetGroup>, usize) {
        let mut dropped = 0;
        let kept = groups
            .into_iter()
            .filter_map(|mut group| {
                let before = group.targets.len();
                let targets = std::mem::take(&mut group.targets);
                let surviving: Vec<_> = targets
                    .into_iter()
                    .filter(|target| !self.is_excluded(&group, target))
                    .collect();
                dropped += before - surviving.len();
                group.targets = surviving;
                (!group.is_empty()).then_some(group)
            })
            .collect();
        (kept, dropped)
    }
}

impl Default for NamespaceFilter {
    fn default() -> Self {
        Self::from_config(&FilterConfig::default())
    }
}
