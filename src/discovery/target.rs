//! Target group data model.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Label name → label value.
pub type LabelSet = BTreeMap<String, String>;

/// Label carrying the `host:port` of a target.
pub const ADDRESS_LABEL: &str = "__address__";

/// A set of targets sharing discovery metadata.
///
/// Every target is identified by its own label set, which always contains
/// [`ADDRESS_LABEL`]. `labels` apply to every target in the group unless the
/// target overrides them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetGroup {
    #[serde(default)]
    pub targets: Vec<LabelSet>,

    #[serde(default, skip_serializing_if = "LabelSet::is_empty")]
    pub labels: LabelSet,

    /// Identifies the group within the provider that produced it.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub source: String,
}

impl TargetGroup {
    /// Create an empty group with the given source key.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Default::default()
        }
    }

    /// Build a group from plain `host:port` addresses.
    pub fn from_addresses<I, S>(source: impl Into<String>, addresses: I, labels: LabelSet) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let targets = addresses
            .into_iter()
            .map(|addr| LabelSet::from([(ADDRESS_LABEL.to_string(), addr.into())]))
            .collect();

        Self {
            targets,
            labels,
            source: source.into(),
        }
    }

    /// Look up a label for one of this group's targets, falling back to the
    /// group labels.
    pub fn effective_label<'a>(&'a self, target: &'a LabelSet, name: &str) -> Option<&'a str> {
        target
            .get(name)
            .or_else(|| self.labels.get(name))
            .map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }
}

/// The on-disk form used by static and file based discovery:
/// `{"targets": ["host:port"], "labels": {...}}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct StaticGroup {
    #[serde(default)]
    pub targets: Vec<String>,

    #[serde(default)]
    pub labels: LabelSet,
}

impl StaticGroup {
    pub fn into_target_group(self, source: impl Into<String>) -> TargetGroup {
        TargetGroup::from_addresses(source, self.targets, self.labels)
    }
}
