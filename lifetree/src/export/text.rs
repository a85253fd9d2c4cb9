//! Indented human-readable tree render.

use crate::tree::{Annotation, ContextEntry, DecisionTree, NodeId};

/// Render `start` and its descendants as an indented markdown tree.
///
/// Two spaces of indentation per depth level below `start`; annotated nodes
/// carry a tags line beneath the summary.
pub fn render_markdown(tree: &DecisionTree, start: NodeId) -> String {
    let mut out = String::new();
    out.push_str(&format!("# Decision Tree: {}\n", tree.statement()));
    if let Some(year) = tree.timeframe() {
        out.push_str(&format!("\nTimeframe: {year}\n"));
    }

    if !tree.context().is_empty() {
        out.push_str("\n## Context\n\n");
        for (domain, entry) in tree.context().entries() {
            let value = match entry {
                ContextEntry::Answered(text) => text.trim(),
                ContextEntry::Skipped => "(skipped)",
            };
            out.push_str(&format!("- {}: {}\n", domain.label(), value));
        }
    }

    out.push_str("\n## Tree\n\n");
    let base_depth = tree.node(start).map(|n| n.depth).unwrap_or(0);
    for id in tree.subtree(start) {
        let node = tree.node(id).expect("subtree id");
        let indent = "  ".repeat((node.depth - base_depth) as usize);
        out.push_str(&format!("{indent}- **[{}]** {}\n", node.id, node.summary));
        if let Some(annotation) = &node.annotation {
            out.push_str(&format!("{indent}  {}\n", tags_line(annotation)));
        }
    }
    out
}

fn tags_line(annotation: &Annotation) -> String {
    format!(
        "*Tags: [Risk: {}] [Growth: {}] [Emotion: {}]*",
        annotation.risk, annotation.growth, annotation.emotion
    )
}
