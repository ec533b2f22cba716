//! Flat team list ⇄ nested org chart.
//!
//! Both directions walk the tree with an explicit stack, so depth is bounded
//! by heap rather than by the call stack.

use std::fmt;
use std::mem;

use tracing::{debug, info, warn};

use crate::child_index::ChildIndex;
use crate::encode::{encode_tree, EncodeError};
use crate::nested_json::{decode_nested, encode_nested};
use crate::record::{parent_ref, record_id, ParentRef, Record, RecordId, CHILDREN_FIELD};

/// A team with its direct sub-teams attached.
///
/// Its JSON form is a single object: the record's own fields in order,
/// followed by `children` (see [`crate::nested_json`]).
#[derive(Default)]
pub struct NestedNode {
    pub fields: Record,
    pub children: Vec<NestedNode>,
}

impl NestedNode {
    pub fn new(fields: Record) -> Self {
        Self {
            fields,
            children: Vec::new(),
        }
    }
}

impl PartialEq for NestedNode {
    fn eq(&self, other: &Self) -> bool {
        let mut pending = vec![(self, other)];
        while let Some((a, b)) = pending.pop() {
            if a.fields != b.fields || a.children.len() != b.children.len() {
                return false;
            }
            pending.extend(a.children.iter().zip(&b.children));
        }
        true
    }
}

impl fmt::Debug for NestedNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = encode_nested(Some(self)).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

impl Drop for NestedNode {
    // Unlinks descendants one by one instead of recursing through `Vec<NestedNode>`.
    fn drop(&mut self) {
        let mut pending = mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

/// Position of the first record without a parent.
///
/// Additional roots are reported and left out of the nested view.
pub fn find_root(records: &[Record]) -> Option<usize> {
    let mut roots = records
        .iter()
        .enumerate()
        .filter(|(_, record)| parent_ref(record) == ParentRef::Root)
        .map(|(handle, _)| handle);

    let root = roots.next()?;
    let ignored = roots.count();
    if ignored > 0 {
        warn!(
            "Found {} extra root teams; using the first one at position {}",
            ignored, root
        );
    }
    Some(root)
}

struct BuildFrame<'a> {
    node: NestedNode,
    pending: std::slice::Iter<'a, usize>,
}

impl<'a> BuildFrame<'a> {
    fn open(record: &Record, index: &'a ChildIndex) -> Self {
        let mut fields = record.clone();
        fields.shift_remove(CHILDREN_FIELD);
        let pending = record_id(record)
            .map(|id| index.lookup(&id))
            .unwrap_or(&[])
            .iter();
        Self {
            node: NestedNode::new(fields),
            pending,
        }
    }
}

/// Assemble the subtree rooted at `root` (a position in `records`).
///
/// `index` must have been built from `records`. Returns `None` when there is
/// no root. A record is placed at most once; repeats caused by duplicate ids
/// are skipped.
pub fn to_nested(
    records: &[Record],
    index: &ChildIndex,
    root: Option<usize>,
) -> Option<NestedNode> {
    let root = root?;
    let root_record = records.get(root)?;
    let mut placed = vec![false; records.len()];
    placed[root] = true;

    let mut stack = vec![BuildFrame::open(root_record, index)];
    loop {
        let next = stack
            .last_mut()
            .and_then(|frame| frame.pending.next().copied());

        if let Some(handle) = next {
            match (records.get(handle), placed.get_mut(handle)) {
                (Some(record), Some(seen)) if !*seen => {
                    *seen = true;
                    stack.push(BuildFrame::open(record, index));
                }
                _ => warn!("Skipping team at position {}: already placed in the tree", handle),
            }
            continue;
        }

        let frame = stack.pop()?;
        match stack.last_mut() {
            Some(parent) => parent.node.children.push(frame.node),
            None => return Some(frame.node),
        }
    }
}

struct FlattenFrame {
    fields: Record,
    pending: std::vec::IntoIter<NestedNode>,
}

impl FlattenFrame {
    fn open(mut node: NestedNode) -> Self {
        let mut fields = mem::take(&mut node.fields);
        fields.shift_remove(CHILDREN_FIELD);
        Self {
            fields,
            pending: mem::take(&mut node.children).into_iter(),
        }
    }
}

/// Flatten a nested tree back into a team list.
///
/// Post-order: each node follows the whole of its children's subtrees, and
/// siblings keep their order. `children` is stripped from every record.
pub fn to_flat(root: Option<NestedNode>) -> Vec<Record> {
    let mut teams = Vec::new();
    let Some(root) = root else {
        return teams;
    };

    let mut stack = vec![FlattenFrame::open(root)];
    while let Some(frame) = stack.last_mut() {
        if let Some(child) = frame.pending.next() {
            stack.push(FlattenFrame::open(child));
        } else if let Some(done) = stack.pop() {
            teams.push(done.fields);
        }
    }
    teams
}

/// A flat team list together with its child index.
#[derive(Debug, Clone, Default)]
pub struct OrgChartTree {
    teams: Vec<Record>,
    children: ChildIndex,
}

impl OrgChartTree {
    pub fn new(teams: Vec<Record>) -> Self {
        let children = ChildIndex::build(&teams);
        Self { teams, children }
    }

    pub fn teams(&self) -> &[Record] {
        &self.teams
    }

    pub fn rebuild_children_index(&mut self) {
        self.children = ChildIndex::build(&self.teams);
    }

    /// The whole org chart, or `None` if the list has no root.
    pub fn nested_tree(&self) -> Option<NestedNode> {
        to_nested(&self.teams, &self.children, find_root(&self.teams))
    }

    /// The subtree under the first team with the given id.
    pub fn subtree(&self, id: &RecordId) -> Option<NestedNode> {
        let root = self
            .teams
            .iter()
            .position(|team| record_id(team).as_ref() == Some(id));
        to_nested(&self.teams, &self.children, root)
    }

    /// Replace the team list with the flattened form of `root`.
    pub fn update_from_nested(&mut self, root: Option<NestedNode>) {
        self.teams = to_flat(root);
        self.rebuild_children_index();
        info!(
            "Team list replaced: {} teams under {} parents",
            self.teams.len(),
            self.children.parent_count()
        );
    }

    /// Replace the team list from a JSON-encoded nested tree.
    ///
    /// Input that does not decode into a tree is treated as an empty tree.
    pub fn update_from_json(&mut self, json: &str) {
        let root = match decode_nested(json) {
            Ok(root) => root,
            Err(e) => {
                warn!("Treating malformed nested tree as empty: {:#}", e);
                None
            }
        };
        debug!("Decoded nested tree ({} bytes)", json.len());
        self.update_from_nested(root);
    }

    /// The org chart in the legacy script encoding.
    pub fn nested_tree_js(&self) -> Result<String, EncodeError> {
        encode_tree(self.nested_tree().as_ref())
    }
}
