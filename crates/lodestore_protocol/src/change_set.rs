//! Change sets: minimal per-predicate insertions and deletions.

use crate::value::{AttributeMap, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A single `(predicate, value)` assertion inside a change set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    /// Predicate name.
    pub predicate: String,
    /// Asserted value.
    pub value: Value,
}

impl Statement {
    /// Creates a new statement.
    pub fn new(predicate: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            predicate: predicate.into(),
            value: value.into(),
        }
    }
}

/// The minimal set of per-predicate additions and removals needed to
/// bring remote state in line with local state.
///
/// A change set is ephemeral: computed per update attempt, transmitted
/// as the partial-update payload, then discarded. An empty change set is
/// a valid no-op outcome, not an error. Statement order within a
/// predicate is insertion order, never sorted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeSet {
    insertions: Vec<Statement>,
    deletions: Vec<Statement>,
}

impl ChangeSet {
    /// Creates an empty change set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a value to add.
    pub fn insert(&mut self, predicate: impl Into<String>, value: impl Into<Value>) {
        self.insertions.push(Statement::new(predicate, value));
    }

    /// Records a value to remove.
    pub fn delete(&mut self, predicate: impl Into<String>, value: impl Into<Value>) {
        self.deletions.push(Statement::new(predicate, value));
    }

    /// Values to add, in computation order.
    #[must_use]
    pub fn insertions(&self) -> &[Statement] {
        &self.insertions
    }

    /// Values to remove, in computation order.
    #[must_use]
    pub fn deletions(&self) -> &[Statement] {
        &self.deletions
    }

    /// Returns true iff both lists are empty across all predicates.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.insertions.is_empty() && self.deletions.is_empty()
    }

    /// Returns every predicate the change set touches.
    #[must_use]
    pub fn predicates(&self) -> BTreeSet<&str> {
        self.insertions
            .iter()
            .chain(self.deletions.iter())
            .map(|s| s.predicate.as_str())
            .collect()
    }

    /// Applies the change set to an attribute map.
    ///
    /// Deletions are removed first (matched by normalized
    /// representation), then insertions are appended in order, skipping
    /// values already present under the predicate.
    pub fn apply(&self, map: &mut AttributeMap) {
        for stmt in &self.deletions {
            let norm = stmt.value.normalized();
            let remaining: Vec<Value> = map
                .get(&stmt.predicate)
                .iter()
                .filter(|v| v.normalized() != norm)
                .cloned()
                .collect();
            map.set(stmt.predicate.clone(), remaining);
        }
        for stmt in &self.insertions {
            let norm = stmt.value.normalized();
            let present = map
                .get(&stmt.predicate)
                .iter()
                .any(|v| v.normalized() == norm);
            if !present {
                map.push(stmt.predicate.clone(), stmt.value.clone());
            }
        }
    }
}
