//! Change-set computation.
//!
//! Diffs the current attribute state against the last-known-persisted
//! baseline, restricted to the keys flagged as locally modified. Keys
//! not flagged are never inspected, which bounds diff cost to touched
//! fields only; on a resource with many untouched fields a sparse
//! update stays cheap.

use lodestore_protocol::{AttributeMap, ChangeSet};
use std::collections::HashSet;

/// Computes the minimal change set between `baseline` and `current`.
///
/// For each modified key, values present now but not in the baseline
/// become insertions and baseline values now absent become deletions,
/// matched by normalized scalar representation. Statement order within
/// a predicate is insertion order. Computing the diff of an unchanged
/// map yields an empty change set, which keeps repeated saves
/// idempotent.
#[must_use]
pub fn compute_change_set(
    baseline: &AttributeMap,
    current: &AttributeMap,
    modified: &[String],
) -> ChangeSet {
    let mut changes = ChangeSet::new();
    let mut seen_keys: HashSet<&str> = HashSet::new();

    for key in modified {
        if !seen_keys.insert(key.as_str()) {
            continue;
        }

        let baseline_values = baseline.get(key);
        let current_values = current.get(key);

        let baseline_norms: HashSet<String> =
            baseline_values.iter().map(|v| v.normalized()).collect();
        let current_norms: HashSet<String> =
            current_values.iter().map(|v| v.normalized()).collect();

        let mut emitted: HashSet<String> = HashSet::new();
        for value in current_values {
            let norm = value.normalized();
            if !baseline_norms.contains(&norm) && emitted.insert(norm) {
                changes.insert(key.clone(), value.clone());
            }
        }

        let mut emitted: HashSet<String> = HashSet::new();
        for value in baseline_values {
            let norm = value.normalized();
            if !current_norms.contains(&norm) && emitted.insert(norm) {
                changes.delete(key.clone(), value.clone());
            }
        }
    }

    changes
}
