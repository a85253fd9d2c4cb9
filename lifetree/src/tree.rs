//! Arena model for a decision tree.
//!
//! Nodes are addressed by opaque integer ids and linked through a
//! parent→ordered-children index rather than embedded references, so the
//! whole tree serializes cleanly and sibling order (creation rank) is
//! explicit. The root is always node 0 at depth 0.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

/// Opaque identifier for a node within one tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

/// The root node of every tree.
pub const ROOT_ID: NodeId = NodeId(0);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fixed set of context domains collected for a decision root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextDomain {
    Career,
    PersonalLife,
    Finances,
    MentalState,
    MetaNotes,
}

impl ContextDomain {
    pub const ALL: [ContextDomain; 5] = [
        ContextDomain::Career,
        ContextDomain::PersonalLife,
        ContextDomain::Finances,
        ContextDomain::MentalState,
        ContextDomain::MetaNotes,
    ];

    /// Key as it appears in context input files and documents.
    pub fn key(self) -> &'static str {
        match self {
            ContextDomain::Career => "career",
            ContextDomain::PersonalLife => "personal_life",
            ContextDomain::Finances => "finances",
            ContextDomain::MentalState => "mental_state",
            ContextDomain::MetaNotes => "meta_notes",
        }
    }

    /// Human-readable label used in prompts and renders.
    pub fn label(self) -> &'static str {
        match self {
            ContextDomain::Career => "Career",
            ContextDomain::PersonalLife => "Personal life",
            ContextDomain::Finances => "Finances",
            ContextDomain::MentalState => "Mental state",
            ContextDomain::MetaNotes => "Notes",
        }
    }

    pub fn from_key(key: &str) -> Option<ContextDomain> {
        ContextDomain::ALL.into_iter().find(|d| d.key() == key)
    }
}

/// One collected context value.
///
/// `Skipped` is an explicit sentinel, distinct from an empty answer, so
/// downstream prompts can tell "declined" from "not asked" (absent key).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextEntry {
    Answered(String),
    Skipped,
}

/// Domain-keyed free-text context attached to a decision root.
///
/// Immutable once the tree is created.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextBlock(BTreeMap<ContextDomain, ContextEntry>);

impl ContextBlock {
    pub fn new(entries: BTreeMap<ContextDomain, ContextEntry>) -> Self {
        Self(entries)
    }

    /// Build from plain string values, where the literal `"skipped"` marks
    /// the skip sentinel.
    pub fn from_plain<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (ContextDomain, S)>,
        S: Into<String>,
    {
        let map = entries
            .into_iter()
            .map(|(domain, value)| {
                let value = value.into();
                let entry = if value == "skipped" {
                    ContextEntry::Skipped
                } else {
                    ContextEntry::Answered(value)
                };
                (domain, entry)
            })
            .collect();
        Self(map)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Entries in fixed domain order.
    pub fn entries(&self) -> impl Iterator<Item = (ContextDomain, &ContextEntry)> {
        self.0.iter().map(|(domain, entry)| (*domain, entry))
    }

    pub fn get(&self, domain: ContextDomain) -> Option<&ContextEntry> {
        self.0.get(&domain)
    }
}

/// Qualitative level for the risk and growth annotation dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Level {
    Low,
    Medium,
    High,
    Unknown,
}

impl Level {
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Low => "Low",
            Level::Medium => "Medium",
            Level::High => "High",
            Level::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized tag set attached to a node after annotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub risk: Level,
    pub growth: Level,
    /// Canonical single-word emotional tone, or `"Unknown"`.
    pub emotion: String,
}

/// One hypothetical narrative state in the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchNode {
    pub id: NodeId,
    /// `None` only for the root node.
    pub parent: Option<NodeId>,
    /// Root is 0; always `parent.depth + 1` otherwise.
    pub depth: u32,
    pub summary: String,
    /// Absent until annotation runs; best-effort, never load-bearing.
    pub annotation: Option<Annotation>,
}

/// A complete decision tree: root metadata plus the node arena.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionTree {
    session: String,
    statement: String,
    timeframe: Option<i32>,
    context: ContextBlock,
    nodes: BTreeMap<NodeId, BranchNode>,
    children: BTreeMap<NodeId, Vec<NodeId>>,
    next_id: u32,
}

impl DecisionTree {
    /// Create a tree with its root node (id 0, depth 0, summary = statement).
    ///
    /// A missing timeframe is backfilled from the first plausible year found
    /// in the statement text.
    pub fn new(
        session: impl Into<String>,
        statement: impl Into<String>,
        timeframe: Option<i32>,
        context: ContextBlock,
    ) -> Self {
        let statement = statement.into();
        let timeframe = timeframe.or_else(|| find_year(&statement));
        let root = BranchNode {
            id: ROOT_ID,
            parent: None,
            depth: 0,
            summary: statement.clone(),
            annotation: None,
        };
        let mut nodes = BTreeMap::new();
        nodes.insert(ROOT_ID, root);
        let mut children = BTreeMap::new();
        children.insert(ROOT_ID, Vec::new());
        Self {
            session: session.into(),
            statement,
            timeframe,
            context,
            nodes,
            children,
            next_id: 1,
        }
    }

    /// Rebuild a tree from raw parts (import path). Callers must have
    /// validated the structural invariants first.
    pub(crate) fn from_parts(
        session: String,
        statement: String,
        timeframe: Option<i32>,
        context: ContextBlock,
        node_list: Vec<BranchNode>,
    ) -> Self {
        let mut nodes = BTreeMap::new();
        let mut children: BTreeMap<NodeId, Vec<NodeId>> = BTreeMap::new();
        let mut next_id = 0u32;
        // Sibling rank equals ascending id order by construction, so
        // inserting in id order reproduces creation ranks exactly.
        for node in node_list {
            next_id = next_id.max(node.id.0 + 1);
            children.entry(node.id).or_default();
            if let Some(parent) = node.parent {
                children.entry(parent).or_default().push(node.id);
            }
            nodes.insert(node.id, node);
        }
        Self {
            session,
            statement,
            timeframe,
            context,
            nodes,
            children,
            next_id,
        }
    }

    pub fn session(&self) -> &str {
        &self.session
    }

    pub fn statement(&self) -> &str {
        &self.statement
    }

    pub fn timeframe(&self) -> Option<i32> {
        self.timeframe
    }

    pub fn context(&self) -> &ContextBlock {
        &self.context
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn node(&self, id: NodeId) -> Option<&BranchNode> {
        self.nodes.get(&id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Child ids of `id` in creation-rank order. Empty for leaves and
    /// unknown ids.
    pub fn children_of(&self, id: NodeId) -> &[NodeId] {
        self.children.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Nodes in ascending id order (creation order).
    pub fn nodes(&self) -> impl Iterator<Item = &BranchNode> {
        self.nodes.values()
    }

    /// Depth-first, creation-rank-ordered ids of `start` and its
    /// descendants. Empty if `start` is unknown.
    pub fn subtree(&self, start: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        if self.contains(start) {
            self.collect_subtree(start, &mut order);
        }
        order
    }

    fn collect_subtree(&self, id: NodeId, order: &mut Vec<NodeId>) {
        order.push(id);
        for child in self.children_of(id).to_vec() {
            self.collect_subtree(child, order);
        }
    }

    /// Append a batch of children under `parent` in the given order.
    ///
    /// Callers (the store) are responsible for cap checks; this only
    /// maintains the arena and the depth/parent invariants by construction.
    pub(crate) fn push_children(&mut self, parent: NodeId, summaries: Vec<String>) -> Vec<NodeId> {
        let depth = self.nodes[&parent].depth + 1;
        let mut ids = Vec::with_capacity(summaries.len());
        for summary in summaries {
            let id = NodeId(self.next_id);
            self.next_id += 1;
            self.nodes.insert(
                id,
                BranchNode {
                    id,
                    parent: Some(parent),
                    depth,
                    summary,
                    annotation: None,
                },
            );
            self.children.insert(id, Vec::new());
            self.children.get_mut(&parent).expect("parent exists").push(id);
            ids.push(id);
        }
        ids
    }

    pub(crate) fn set_annotation(&mut self, id: NodeId, annotation: Annotation) -> bool {
        match self.nodes.get_mut(&id) {
            Some(node) => {
                node.annotation = Some(annotation);
                true
            }
            None => false,
        }
    }
}

/// Find the first 4-digit year (19xx or 20xx) in free text.
pub fn find_year(text: &str) -> Option<i32> {
    static YEAR_RE: LazyLock<regex::Regex> =
        LazyLock::new(|| regex::Regex::new(r"\b(19|20)\d{2}\b").unwrap());
    YEAR_RE
        .find(text)
        .and_then(|m| m.as_str().parse::<i32>().ok())
}
