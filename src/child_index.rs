//! Parent → children index over a flat team list.
//!
//! The index stores handles (positions in the flat list) rather than record
//! copies, so the flat list stays the single owner of record data.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::record::{parent_ref, ParentRef, Record, RecordId};

/// Children of every parent, in the order they appear in the flat list.
#[derive(Debug, Clone, Default)]
pub struct ChildIndex {
    children: HashMap<RecordId, Vec<usize>>,
}

impl ChildIndex {
    /// Build the index in one pass over `records`. Roots are skipped.
    pub fn build(records: &[Record]) -> Self {
        let mut children: HashMap<RecordId, Vec<usize>> = HashMap::new();

        for (handle, record) in records.iter().enumerate() {
            match parent_ref(record) {
                ParentRef::Root => continue,
                ParentRef::Id(parent) => children.entry(parent).or_default().push(handle),
                ParentRef::Invalid => {
                    warn!(
                        "Skipping team at position {}: parent_id is not a usable key",
                        handle
                    );
                }
            }
        }

        debug!(
            "Built child index: {} parents over {} teams",
            children.len(),
            records.len()
        );
        Self { children }
    }

    /// Handles of the direct children of `parent`; empty if it has none.
    pub fn lookup(&self, parent: &RecordId) -> &[usize] {
        self.children.get(parent).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of distinct parents with at least one child.
    pub fn parent_count(&self) -> usize {
        self.children.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn teams(value: Value) -> Vec<Record> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_build_skips_roots_and_keeps_input_order() {
        let records = teams(json!([
            {"id": 2, "parent_id": 1},
            {"id": 4, "parent_id": 3},
            {"id": 3, "parent_id": 1},
            {"id": 5, "parent_id": 3},
            {"id": 1, "parent_id": null},
        ]));
        let index = ChildIndex::build(&records);

        assert_eq!(index.parent_count(), 2);
        assert_eq!(index.lookup(&RecordId::from(1)), &[0, 2]);
        assert_eq!(index.lookup(&RecordId::from(3)), &[1, 3]);
    }

    #[test]
    fn test_lookup_missing_parent_is_empty() {
        let index = ChildIndex::build(&teams(json!([{"id": 1, "parent_id": null}])));
        assert_eq!(index.parent_count(), 0);
        assert!(index.lookup(&RecordId::from(42)).is_empty());
    }

    #[test]
    fn test_string_and_integer_parents_share_a_key() {
        let records = teams(json!([
            {"id": 1, "parent_id": null},
            {"id": "b", "parent_id": "1"},
            {"id": "a", "parent_id": 1},
        ]));
        let index = ChildIndex::build(&records);
        assert_eq!(index.lookup(&RecordId::from(1)), &[1, 2]);
    }

    #[test]
    fn test_invalid_parent_is_not_indexed() {
        let records = teams(json!([
            {"id": 1, "parent_id": null},
            {"id": 2, "parent_id": [1]},
        ]));
        assert_eq!(ChildIndex::build(&records).parent_count(), 0);
    }
}
