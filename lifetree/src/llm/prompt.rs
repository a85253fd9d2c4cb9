//! Prompt rendering for collaborator calls.

use minijinja::{Environment, context};

use crate::llm::{AnnotateRequest, GenerateRequest};
use crate::tree::{ContextBlock, ContextEntry};

const BRANCH_TEMPLATE: &str = include_str!("prompts/branch.md");
const ANNOTATE_TEMPLATE: &str = include_str!("prompts/annotate.md");

/// Hint appended to the branch prompt on retry, when the first attempt
/// produced too few usable options.
pub const RETRY_HINT: &str = "Your previous reply contained too few distinct options. \
     Make sure every array entry is a separate, non-empty path.";

/// Template engine wrapper around minijinja.
struct PromptEngine {
    env: Environment<'static>,
}

impl PromptEngine {
    fn new() -> Self {
        let mut env = Environment::new();
        env.add_template("branch", BRANCH_TEMPLATE)
            .expect("branch template should be valid");
        env.add_template("annotate", ANNOTATE_TEMPLATE)
            .expect("annotate template should be valid");
        Self { env }
    }
}

/// Render the branch-generation prompt.
pub fn render_branch(request: &GenerateRequest) -> String {
    let engine = PromptEngine::new();
    let template = engine.env.get_template("branch").expect("registered");
    template
        .render(context! {
            context => non_empty(&request.context).unwrap_or("(no context collected)"),
            parent_summary => request.parent_summary.trim(),
            count => request.count,
            remaining_depth => request.remaining_depth,
            hint => request.hint.as_deref().map(str::trim).filter(|s| !s.is_empty()),
        })
        .expect("branch template rendering should not fail")
}

/// Render the annotation prompt.
pub fn render_annotate(request: &AnnotateRequest) -> String {
    let engine = PromptEngine::new();
    let template = engine.env.get_template("annotate").expect("registered");
    template
        .render(context! {
            summary => request.summary.trim(),
        })
        .expect("annotate template rendering should not fail")
}

/// Render a context block as prompt lines, one domain per line.
///
/// Skipped domains render as `(skipped)` so the model can tell "declined"
/// from "not asked"; absent domains are omitted entirely.
pub fn context_lines(block: &ContextBlock) -> String {
    let mut lines = Vec::new();
    for (domain, entry) in block.entries() {
        let value = match entry {
            ContextEntry::Answered(text) => text.trim(),
            ContextEntry::Skipped => "(skipped)",
        };
        lines.push(format!("- {}: {}", domain.label(), value));
    }
    lines.join("\n")
}

fn non_empty(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::ContextDomain;
    use std::time::Duration;

    fn sample_request(hint: Option<&str>) -> GenerateRequest {
        GenerateRequest {
            parent_summary: "Move to Berlin in 2023".to_string(),
            context: "- Career: engineer".to_string(),
            remaining_depth: 2,
            count: 3,
            hint: hint.map(str::to_string),
            timeout: Duration::from_secs(30),
        }
    }

    #[test]
    fn branch_prompt_carries_count_context_and_summary() {
        let prompt = render_branch(&sample_request(None));
        assert!(prompt.contains("exactly 3 distinct"));
        assert!(prompt.contains("- Career: engineer"));
        assert!(prompt.contains("Move to Berlin in 2023"));
        assert!(prompt.contains("<context>"));
        assert!(prompt.contains("</decision>"));
        assert!(!prompt.contains("too few distinct options"));
    }

    #[test]
    fn branch_prompt_includes_hint_only_on_retry() {
        let prompt = render_branch(&sample_request(Some(RETRY_HINT)));
        assert!(prompt.contains("too few distinct options"));
    }

    #[test]
    fn branch_prompt_marks_missing_context() {
        let mut request = sample_request(None);
        request.context = String::new();
        let prompt = render_branch(&request);
        assert!(prompt.contains("(no context collected)"));
    }

    #[test]
    fn annotate_prompt_embeds_summary() {
        let prompt = render_annotate(&AnnotateRequest {
            summary: "Take the teaching job".to_string(),
            timeout: Duration::from_secs(30),
        });
        assert!(prompt.contains("Take the teaching job"));
        assert!(prompt.contains("\"risk\""));
    }

    #[test]
    fn context_lines_render_skip_sentinel_and_omit_absent() {
        let block = ContextBlock::from_plain([
            (ContextDomain::Career, "engineer"),
            (ContextDomain::Finances, "skipped"),
        ]);
        let lines = context_lines(&block);
        assert_eq!(lines, "- Career: engineer\n- Finances: (skipped)");
    }
}
