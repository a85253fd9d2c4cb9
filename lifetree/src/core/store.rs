//! Tree store: the mutation contract over the node arena.
//!
//! Every write goes through this type so the cap check and the write it
//! protects form one atomic unit. A batch of children is either written in
//! full and counted, or not at all.

use thiserror::Error;

use crate::core::types::Caps;
use crate::tree::{Annotation, BranchNode, ContextBlock, DecisionTree, NodeId, ROOT_ID};

/// Errors from the tree store contract.
///
/// Structural violations (`DuplicateRoot`, `NotFound`) abort the operation
/// and are reported verbatim; `CapExceeded` is a soft condition the engine
/// turns into a notice.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("a tree already exists for session '{session}'")]
    DuplicateRoot { session: String },
    #[error("node {id} not found")]
    NotFound { id: NodeId },
    #[error(
        "cap exceeded: {requested} children under node {parent} would bring the tree to \
         {projected} nodes (max {max_nodes})"
    )]
    CapExceeded {
        parent: NodeId,
        requested: usize,
        projected: usize,
        max_nodes: usize,
    },
    #[error("cap exceeded: children of node {parent} would sit at depth {depth} (max {max_depth})")]
    DepthExceeded {
        parent: NodeId,
        depth: u32,
        max_depth: u32,
    },
}

/// An arena-backed tree plus the caps that bound it.
#[derive(Debug, Clone)]
pub struct TreeStore {
    tree: DecisionTree,
    caps: Caps,
}

impl TreeStore {
    /// Create a fresh tree with its root node (id 0, depth 0).
    pub fn create_root(
        session: impl Into<String>,
        statement: impl Into<String>,
        timeframe: Option<i32>,
        context: ContextBlock,
        caps: Caps,
    ) -> Self {
        Self {
            tree: DecisionTree::new(session, statement, timeframe, context),
            caps,
        }
    }

    /// Wrap an existing (validated) tree.
    pub fn open(tree: DecisionTree, caps: Caps) -> Self {
        Self { tree, caps }
    }

    pub fn tree(&self) -> &DecisionTree {
        &self.tree
    }

    pub fn into_tree(self) -> DecisionTree {
        self.tree
    }

    pub fn caps(&self) -> Caps {
        self.caps
    }

    pub fn root(&self) -> NodeId {
        ROOT_ID
    }

    pub fn node(&self, id: NodeId) -> Result<&BranchNode, StoreError> {
        self.tree.node(id).ok_or(StoreError::NotFound { id })
    }

    pub fn node_count(&self) -> usize {
        self.tree.node_count()
    }

    /// Child ids in creation-rank order.
    pub fn children_of(&self, id: NodeId) -> Result<&[NodeId], StoreError> {
        if !self.tree.contains(id) {
            return Err(StoreError::NotFound { id });
        }
        Ok(self.tree.children_of(id))
    }

    /// Atomically create one batch of children under `parent`.
    ///
    /// The caps are checked before any node is written; on `CapExceeded` or
    /// `DepthExceeded` the tree is untouched.
    pub fn create_children(
        &mut self,
        parent: NodeId,
        summaries: Vec<String>,
    ) -> Result<Vec<NodeId>, StoreError> {
        let parent_node = self.node(parent)?;
        let child_depth = parent_node.depth + 1;
        if child_depth > self.caps.max_depth {
            return Err(StoreError::DepthExceeded {
                parent,
                depth: child_depth,
                max_depth: self.caps.max_depth,
            });
        }
        let projected = self.tree.node_count() + summaries.len();
        if projected > self.caps.max_nodes {
            return Err(StoreError::CapExceeded {
                parent,
                requested: summaries.len(),
                projected,
                max_nodes: self.caps.max_nodes,
            });
        }
        Ok(self.tree.push_children(parent, summaries))
    }

    /// Attach (or overwrite) a node's annotation.
    pub fn attach_annotation(
        &mut self,
        id: NodeId,
        annotation: Annotation,
    ) -> Result<(), StoreError> {
        if self.tree.set_annotation(id, annotation) {
            Ok(())
        } else {
            Err(StoreError::NotFound { id })
        }
    }

    /// Depth-first, rank-ordered ids of `id` and its descendants.
    pub fn get_subtree(&self, id: NodeId) -> Result<Vec<NodeId>, StoreError> {
        if !self.tree.contains(id) {
            return Err(StoreError::NotFound { id });
        }
        Ok(self.tree.subtree(id))
    }
}
