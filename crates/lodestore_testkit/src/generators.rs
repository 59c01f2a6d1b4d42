//! Property-based test generators using proptest.
//!
//! Provides strategies for generating attribute maps and
//! baseline/current pairs that maintain the invariants the change-set
//! computer is specified against.

use lodestore_protocol::{AttributeMap, Value};
use proptest::prelude::*;

/// Strategy for generating valid predicate names.
pub fn predicate_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9_]{0,11}").expect("valid regex")
}

/// Strategy for generating attribute values.
///
/// Floats are excluded on purpose: equality in these tests goes through
/// the derived comparisons as well as the normalized representation.
pub fn value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        3 => prop::string::string_regex("[a-zA-Z0-9 ]{0,12}")
            .expect("valid regex")
            .prop_map(Value::from),
        2 => any::<i64>().prop_map(Value::from),
        1 => any::<bool>().prop_map(Value::from),
    ]
}

/// Strategy for generating attribute maps.
pub fn attribute_map_strategy() -> impl Strategy<Value = AttributeMap> {
    prop::collection::btree_map(
        predicate_strategy(),
        prop::collection::vec(value_strategy(), 1..4),
        0..6,
    )
    .prop_map(|entries| {
        let mut map = AttributeMap::new();
        for (predicate, values) in entries {
            map.set(predicate, values);
        }
        map
    })
}

/// A baseline/current pair differing only in the listed keys.
#[derive(Debug, Clone)]
pub struct Modification {
    /// The last-known-persisted attribute state.
    pub baseline: AttributeMap,
    /// The current attribute state.
    pub current: AttributeMap,
    /// The keys flagged as locally modified.
    pub modified: Vec<String>,
}

/// Strategy for generating a baseline, a set of modified keys, and the
/// current map obtained by applying those modifications.
///
/// A modification either replaces a predicate's values or removes the
/// predicate entirely; a flagged key whose values end up unchanged is
/// also possible and must diff to nothing.
pub fn modification_strategy() -> impl Strategy<Value = Modification> {
    (
        attribute_map_strategy(),
        prop::collection::vec(
            (
                predicate_strategy(),
                prop::option::of(prop::collection::vec(value_strategy(), 1..4)),
            ),
            0..4,
        ),
    )
        .prop_map(|(baseline, edits)| {
            let mut current = baseline.clone();
            let mut modified = Vec::new();
            for (predicate, values) in edits {
                modified.push(predicate.clone());
                match values {
                    Some(values) => current.set(predicate, values),
                    None => {
                        current.remove(&predicate);
                    }
                }
            }
            Modification {
                baseline,
                current,
                modified,
            }
        })
}
