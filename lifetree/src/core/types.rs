//! Shared deterministic types for expansion outcomes.
//!
//! These types define stable contracts between the engine and its callers.
//! They must not depend on external state or I/O.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::tree::NodeId;

/// Hard limits on a tree, enforced before any write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caps {
    /// Maximum node depth (root = 0).
    pub max_depth: u32,
    /// Maximum total node count per tree, independent of depth.
    pub max_nodes: usize,
}

impl Default for Caps {
    fn default() -> Self {
        Self {
            max_depth: 3,
            max_nodes: 50,
        }
    }
}

/// How an expansion finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpansionStatus {
    /// Everything requested was generated, stored, and annotated.
    Completed,
    /// The call finished with reduced fidelity (capped fan-out, missing
    /// annotations, thin branches, deadline hit).
    Degraded,
}

/// A single reduced-fidelity event observed during expansion.
///
/// Notices are reported to the user as warnings; none of them fail the
/// operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Requested depth would exceed the depth cap; nothing was generated.
    DepthLimit {
        node: NodeId,
        requested: u32,
        max_depth: u32,
    },
    /// The tree was already at the node cap before generating.
    NodeCapReached { node: NodeId },
    /// A child batch did not fit under the node cap; zero nodes written.
    Capped { node: NodeId, requested: usize },
    /// Generation returned fewer summaries than requested, even after retry.
    ThinBranch {
        node: NodeId,
        produced: usize,
        requested: u32,
    },
    /// Generation produced nothing usable; the node stays a leaf.
    GenerationFailed { node: NodeId },
    /// Annotation failed after retry; the node stays unannotated.
    AnnotationMissing { node: NodeId },
    /// The caller-supplied deadline expired mid-traversal.
    DeadlineReached { node: NodeId },
}

impl Notice {
    /// Whether this notice stops the traversal (as opposed to degrading a
    /// single node).
    pub fn stops_traversal(&self) -> bool {
        matches!(
            self,
            Notice::DepthLimit { .. }
                | Notice::NodeCapReached { .. }
                | Notice::Capped { .. }
                | Notice::DeadlineReached { .. }
        )
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::DepthLimit {
                node,
                requested,
                max_depth,
            } => write!(
                f,
                "depth limit: expanding node {node} by {requested} would exceed max depth {max_depth}"
            ),
            Notice::NodeCapReached { node } => {
                write!(f, "node cap reached before expanding node {node}")
            }
            Notice::Capped { node, requested } => write!(
                f,
                "tree capped: {requested} children under node {node} would exceed the node cap"
            ),
            Notice::ThinBranch {
                node,
                produced,
                requested,
            } => write!(
                f,
                "thin branch under node {node}: got {produced} of {requested} requested summaries"
            ),
            Notice::GenerationFailed { node } => {
                write!(f, "generation failed for node {node}; left as a leaf")
            }
            Notice::AnnotationMissing { node } => {
                write!(f, "annotation missing for node {node}")
            }
            Notice::DeadlineReached { node } => {
                write!(f, "deadline reached while expanding node {node}")
            }
        }
    }
}

/// Outcome of one expansion call: what was written plus every
/// reduced-fidelity event, in occurrence order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpansionReport {
    /// The node expansion started from.
    pub target: NodeId,
    pub nodes_created: usize,
    pub nodes_annotated: usize,
    pub notices: Vec<Notice>,
}

impl ExpansionReport {
    pub fn new(target: NodeId) -> Self {
        Self {
            target,
            nodes_created: 0,
            nodes_annotated: 0,
            notices: Vec::new(),
        }
    }

    pub fn status(&self) -> ExpansionStatus {
        if self.notices.is_empty() {
            ExpansionStatus::Completed
        } else {
            ExpansionStatus::Degraded
        }
    }

    /// True once a traversal-stopping notice has been recorded.
    pub fn stopped(&self) -> bool {
        self.notices.iter().any(Notice::stops_traversal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_status_degrades_on_any_notice() {
        let mut report = ExpansionReport::new(NodeId(0));
        assert_eq!(report.status(), ExpansionStatus::Completed);
        report.notices.push(Notice::AnnotationMissing { node: NodeId(2) });
        assert_eq!(report.status(), ExpansionStatus::Degraded);
        assert!(!report.stopped());
        report.notices.push(Notice::Capped {
            node: NodeId(3),
            requested: 2,
        });
        assert!(report.stopped());
    }
}
