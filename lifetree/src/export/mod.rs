//! Pure renderers over a tree snapshot.
//!
//! All formats are deterministic functions of the tree: children render in
//! creation-rank order, no timestamps, no collaborator calls, no store
//! writes. Re-exporting an unchanged tree is byte-identical, so exports can
//! be diffed and shared.

use anyhow::Result;
use clap::ValueEnum;

use crate::tree::{DecisionTree, ROOT_ID};

pub mod document;
pub mod mermaid;
pub mod text;

/// Supported export formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    /// Indented human-readable tree (summary + tags per node).
    Markdown,
    /// Mermaid `graph TD` definition for a directed-graph renderer.
    Mermaid,
    /// Structured tree document, re-importable to an identical tree.
    Json,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Markdown => "md",
            ExportFormat::Mermaid => "mmd",
            ExportFormat::Json => "json",
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ExportFormat::Markdown => "markdown",
            ExportFormat::Mermaid => "mermaid",
            ExportFormat::Json => "json",
        };
        f.write_str(name)
    }
}

/// Render the whole tree in the requested format.
pub fn render(tree: &DecisionTree, format: ExportFormat) -> Result<String> {
    match format {
        ExportFormat::Markdown => Ok(text::render_markdown(tree, ROOT_ID)),
        ExportFormat::Mermaid => Ok(mermaid::render_mermaid(tree, ROOT_ID)),
        ExportFormat::Json => document::render_json(tree),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_context;

    #[test]
    fn all_formats_render_twice_byte_identical() {
        let mut tree = DecisionTree::new("session-1", "Move to Berlin in 2023", None, sample_context());
        let level1 = tree.push_children(ROOT_ID, vec!["stay".into(), "go".into()]);
        tree.push_children(level1[0], vec!["settle in".into()]);

        for format in [ExportFormat::Markdown, ExportFormat::Mermaid, ExportFormat::Json] {
            let first = render(&tree, format).expect("render");
            let second = render(&tree, format).expect("render again");
            assert_eq!(first, second);
        }
    }
}
