//! Mermaid graph render.

use crate::tree::{DecisionTree, NodeId};

/// Render `start` and its descendants as a Mermaid `graph TD` definition.
///
/// One node line per node (label = summary plus tags when annotated), one
/// edge line per parent→child link, emitted in depth-first creation-rank
/// order.
pub fn render_mermaid(tree: &DecisionTree, start: NodeId) -> String {
    let mut lines = vec!["graph TD".to_string()];
    for id in tree.subtree(start) {
        let node = tree.node(id).expect("subtree id");
        let mut label = sanitize(&node.summary);
        if let Some(annotation) = &node.annotation {
            label.push_str(&format!(
                "<br/>[Risk: {}] [Growth: {}] [Emotion: {}]",
                annotation.risk, annotation.growth, annotation.emotion
            ));
        }
        lines.push(format!("    N{}[\"{}\"]", node.id, label));
        for child in tree.children_of(id) {
            lines.push(format!("    N{} --> N{}", node.id, child));
        }
    }
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Quotes would terminate the Mermaid label early; use the #quot; entity.
fn sanitize(text: &str) -> String {
    text.replace('"', "#quot;")
}
