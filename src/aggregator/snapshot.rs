//! Externally visible state.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::discovery::TargetGroup;

/// Filtered target groups per job.
///
/// A job is present only while it has at least one group with at least one
/// target. Serializes as a plain JSON object keyed by job name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Snapshot {
    jobs: BTreeMap<String, Vec<TargetGroup>>,
}

impl Snapshot {
    pub fn get(&self, job: &str) -> Option<&[TargetGroup]> {
        self.jobs.get(job).map(Vec::as_slice)
    }

    pub fn contains(&self, job: &str) -> bool {
        self.jobs.contains_key(job)
    }

    pub fn jobs(&self) -> impl Iterator<Item = (&str, &[TargetGroup])> {
        self.jobs.iter().map(|(job, groups)| (job.as_str(), groups.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn group_count(&self) -> usize {
        self.jobs.values().map(Vec::len).sum()
    }

    pub fn target_count(&self) -> usize {
        self.jobs.values().flatten().map(TargetGroup::len).sum()
    }

    /// Set or clear a job. Empty group lists remove the job.
    pub(crate) fn replace(&mut self, job: String, groups: Vec<TargetGroup>) {
        if groups.is_empty() {
            self.jobs.remove(&job);
        } else {
            self.jobs.insert(job, groups);
        }
    }
}
