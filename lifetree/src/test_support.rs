//! Test-only helpers: scripted collaborators and fixture builders.

use std::cell::RefCell;
use std::collections::VecDeque;

use anyhow::{Result, anyhow};

use crate::llm::{AnnotateRequest, Collaborator, GenerateRequest, RawAnnotation};
use crate::tree::{ContextBlock, ContextDomain};

/// One scripted generation reply.
#[derive(Debug, Clone)]
pub enum GenReply {
    Ok(Vec<String>),
    Fail(&'static str),
}

/// One scripted annotation reply.
#[derive(Debug, Clone)]
pub enum AnnReply {
    Ok(RawAnnotation),
    Fail(&'static str),
}

/// Deterministic collaborator double.
///
/// Scripted replies are consumed front-to-back; once the script is empty,
/// generation falls back to deriving `count` distinct summaries from the
/// parent summary, and annotation falls back to `default_annotation` (or an
/// error when unset). All requests are logged for assertions.
pub struct ScriptedCollaborator {
    generate_script: RefCell<VecDeque<GenReply>>,
    annotate_script: RefCell<VecDeque<AnnReply>>,
    default_annotation: Option<RawAnnotation>,
    pub generate_calls: RefCell<Vec<GenerateRequest>>,
    pub annotate_calls: RefCell<Vec<AnnotateRequest>>,
}

impl ScriptedCollaborator {
    /// Collaborator that always produces the requested fan-out and a fixed
    /// annotation.
    pub fn reliable() -> Self {
        Self {
            generate_script: RefCell::new(VecDeque::new()),
            annotate_script: RefCell::new(VecDeque::new()),
            default_annotation: Some(RawAnnotation {
                risk: "Medium".to_string(),
                growth: "High".to_string(),
                emotion: "Hopeful".to_string(),
            }),
            generate_calls: RefCell::new(Vec::new()),
            annotate_calls: RefCell::new(Vec::new()),
        }
    }

    /// Collaborator whose annotation calls always fail.
    pub fn without_annotations() -> Self {
        Self {
            default_annotation: None,
            ..Self::reliable()
        }
    }

    pub fn push_generate(&self, reply: GenReply) {
        self.generate_script.borrow_mut().push_back(reply);
    }

    pub fn push_annotate(&self, reply: AnnReply) {
        self.annotate_script.borrow_mut().push_back(reply);
    }

    pub fn generate_call_count(&self) -> usize {
        self.generate_calls.borrow().len()
    }
}

impl Collaborator for ScriptedCollaborator {
    fn generate(&self, request: &GenerateRequest) -> Result<Vec<String>> {
        self.generate_calls.borrow_mut().push(request.clone());
        if let Some(reply) = self.generate_script.borrow_mut().pop_front() {
            return match reply {
                GenReply::Ok(summaries) => Ok(summaries),
                GenReply::Fail(msg) => Err(anyhow!(msg)),
            };
        }
        Ok((1..=request.count)
            .map(|i| format!("{} > option {i}", request.parent_summary))
            .collect())
    }

    fn annotate(&self, request: &AnnotateRequest) -> Result<RawAnnotation> {
        self.annotate_calls.borrow_mut().push(request.clone());
        if let Some(reply) = self.annotate_script.borrow_mut().pop_front() {
            return match reply {
                AnnReply::Ok(raw) => Ok(raw),
                AnnReply::Fail(msg) => Err(anyhow!(msg)),
            };
        }
        self.default_annotation
            .clone()
            .ok_or_else(|| anyhow!("annotation unavailable"))
    }
}

/// The canonical grounded-scenario context block.
pub fn sample_context() -> ContextBlock {
    ContextBlock::from_plain([
        (ContextDomain::Career, "engineer"),
        (ContextDomain::PersonalLife, ""),
        (ContextDomain::Finances, "skipped"),
        (ContextDomain::MentalState, "curious"),
        (ContextDomain::MetaNotes, ""),
    ])
}
