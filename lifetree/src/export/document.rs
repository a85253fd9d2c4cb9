//! Structured tree document: the canonical serialized form of a tree.
//!
//! The same document serves as the persisted session state and the `json`
//! export format, so the round-trip property (export → import yields an
//! identical tree) is exercised on every load. Imported documents are
//! untrusted: they are validated against the embedded JSON Schema first,
//! then against the structural invariants, before an arena is rebuilt.

use std::sync::LazyLock;

use anyhow::{Context, Result, anyhow, bail};
use jsonschema::{Draft, Validator};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::invariants::validate_nodes;
use crate::tree::{Annotation, BranchNode, ContextBlock, DecisionTree, NodeId};

const V1_SCHEMA: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/schemas/tree_document.v1.schema.json"
));

pub const DOCUMENT_VERSION: u32 = 1;

/// Serialized tree, nodes in ascending-id (creation) order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeDocument {
    pub version: u32,
    pub session: String,
    pub statement: String,
    pub timeframe: Option<i32>,
    pub context: ContextBlock,
    pub nodes: Vec<NodeDocument>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeDocument {
    pub id: u32,
    pub parent: Option<u32>,
    pub depth: u32,
    pub summary: String,
    pub annotation: Option<Annotation>,
}

/// Snapshot a tree into its document form.
pub fn to_document(tree: &DecisionTree) -> TreeDocument {
    TreeDocument {
        version: DOCUMENT_VERSION,
        session: tree.session().to_string(),
        statement: tree.statement().to_string(),
        timeframe: tree.timeframe(),
        context: tree.context().clone(),
        nodes: tree
            .nodes()
            .map(|node| NodeDocument {
                id: node.id.0,
                parent: node.parent.map(|p| p.0),
                depth: node.depth,
                summary: node.summary.clone(),
                annotation: node.annotation.clone(),
            })
            .collect(),
    }
}

/// Render a tree as pretty-printed document JSON with trailing newline.
pub fn render_json(tree: &DecisionTree) -> Result<String> {
    let mut buf = serde_json::to_string_pretty(&to_document(tree)).context("serialize document")?;
    buf.push('\n');
    Ok(buf)
}

/// Rebuild a tree from a document, enforcing structural invariants.
pub fn from_document(doc: TreeDocument) -> Result<DecisionTree> {
    if doc.version != DOCUMENT_VERSION {
        bail!("unsupported document version {}", doc.version);
    }
    let mut nodes: Vec<BranchNode> = doc
        .nodes
        .into_iter()
        .map(|node| BranchNode {
            id: NodeId(node.id),
            parent: node.parent.map(NodeId),
            depth: node.depth,
            summary: node.summary,
            annotation: node.annotation,
        })
        .collect();
    // Sibling rank is defined by ascending id; canonicalize before rebuild.
    nodes.sort_by_key(|node| node.id);

    let errors = validate_nodes(&nodes);
    if !errors.is_empty() {
        bail!("tree invariants failed: {}", errors.join("; "));
    }

    Ok(DecisionTree::from_parts(
        doc.session,
        doc.statement,
        doc.timeframe,
        doc.context,
        nodes,
    ))
}

/// Parse document JSON: schema validation, then deserialization, then
/// invariants.
pub fn parse_json(contents: &str) -> Result<DecisionTree> {
    let value: Value = serde_json::from_str(contents).context("parse document json")?;
    validate_schema(&value)?;
    let doc: TreeDocument =
        serde_json::from_value(value).context("deserialize tree document")?;
    from_document(doc)
}

/// Validate a JSON instance against the embedded v1 schema (Draft 2020-12).
fn validate_schema(instance: &Value) -> Result<()> {
    static VALIDATOR: LazyLock<Validator> = LazyLock::new(|| {
        let schema: Value = serde_json::from_str(V1_SCHEMA).expect("embedded schema is json");
        jsonschema::options()
            .with_draft(Draft::Draft202012)
            .build(&schema)
            .expect("embedded schema compiles")
    });
    let messages: Vec<String> = VALIDATOR
        .iter_errors(instance)
        .map(|err| err.to_string())
        .collect();
    if !messages.is_empty() {
        return Err(anyhow!(
            "document schema validation failed: {}",
            messages.join("; ")
        ));
    }
    Ok(())
}
