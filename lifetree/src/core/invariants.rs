//! Structural invariants checked when a tree document is imported.
//!
//! Trees built through the store hold these by construction; imported
//! documents are untrusted and validated before an arena is rebuilt:
//! - exactly one root: id 0, depth 0, no parent
//! - no duplicate ids
//! - every parent exists, `depth = parent.depth + 1`, `parent.id < id`
//! - every node reachable from the root (connected, acyclic)

use std::collections::{BTreeMap, BTreeSet};

use crate::tree::{BranchNode, NodeId, ROOT_ID};

/// Check invariants over a flat node list, returning stable error messages.
pub fn validate_nodes(nodes: &[BranchNode]) -> Vec<String> {
    let mut errors = Vec::new();

    let mut seen = BTreeSet::new();
    for node in nodes {
        if !seen.insert(node.id) {
            errors.push(format!("duplicate id {}", node.id));
        }
    }

    let by_id: BTreeMap<NodeId, &BranchNode> = nodes.iter().map(|n| (n.id, n)).collect();

    match by_id.get(&ROOT_ID) {
        None => errors.push("missing root node 0".to_string()),
        Some(root) => {
            if root.parent.is_some() {
                errors.push("root node 0 must not have a parent".to_string());
            }
            if root.depth != 0 {
                errors.push(format!("root node 0 must be at depth 0, got {}", root.depth));
            }
        }
    }

    for node in nodes {
        if node.id == ROOT_ID {
            continue;
        }
        let Some(parent_id) = node.parent else {
            errors.push(format!("node {} has no parent but is not the root", node.id));
            continue;
        };
        if parent_id.0 >= node.id.0 {
            errors.push(format!(
                "node {} must have a lower-id parent, got {parent_id}",
                node.id
            ));
        }
        match by_id.get(&parent_id) {
            None => errors.push(format!("node {} references missing parent {parent_id}", node.id)),
            Some(parent) => {
                if node.depth != parent.depth + 1 {
                    errors.push(format!(
                        "node {} at depth {} under parent {} at depth {}",
                        node.id, node.depth, parent.id, parent.depth
                    ));
                }
            }
        }
    }

    // Reachability from the root; with single parents this also rules out
    // cycles among well-formed nodes.
    if by_id.contains_key(&ROOT_ID) {
        let mut children: BTreeMap<NodeId, Vec<NodeId>> = BTreeMap::new();
        for node in nodes {
            if let Some(parent) = node.parent {
                children.entry(parent).or_default().push(node.id);
            }
        }
        let mut reachable = BTreeSet::new();
        let mut stack = vec![ROOT_ID];
        while let Some(id) = stack.pop() {
            if !reachable.insert(id) {
                continue;
            }
            if let Some(kids) = children.get(&id) {
                stack.extend(kids.iter().copied());
            }
        }
        for node in nodes {
            if !reachable.contains(&node.id) {
                errors.push(format!("node {} is not reachable from the root", node.id));
            }
        }
    }

    errors
}
