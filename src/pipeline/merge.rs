//! Candidate merging across extraction passes.

use tracing::debug;

use super::oracle::CandidateSet;

/// What to do when an incoming candidate collides with one already merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePolicy {
    /// Existing candidate wins.
    Keep,
    /// Incoming candidate wins.
    Overwrite,
    /// Incoming candidate wins only when the existing value is empty.
    OverwriteIfEmpty,
}

/// Fold `incoming` into `base` under the given collision policy. New field
/// names are always admitted.
pub fn merge_candidates(base: &mut CandidateSet, incoming: CandidateSet, policy: MergePolicy) {
    for (name, candidate) in incoming {
        match base.get(&name) {
            None => {
                base.insert(name, candidate);
            }
            Some(existing) => {
                let replace = match policy {
                    MergePolicy::Keep => false,
                    MergePolicy::Overwrite => true,
                    MergePolicy::OverwriteIfEmpty => existing.value.trim().is_empty(),
                };
                if replace {
                    debug!(field = %name, policy = ?policy, "replacing merged candidate");
                    base.insert(name, candidate);
                }
            }
        }
    }
}
