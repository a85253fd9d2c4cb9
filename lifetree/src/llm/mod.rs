//! Collaborator abstraction for text generation and annotation.
//!
//! The [`Collaborator`] trait decouples the expansion engine from the
//! backend that actually produces text (currently a configured command fed
//! over stdin). Tests use scripted collaborators that return predetermined
//! replies without spawning processes. The engine treats every call as
//! potentially slow, failing, or malformed; retry and degrade policy live
//! in the engine, not here.

use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

pub mod command;
pub mod parse;
pub mod prompt;

pub use command::CommandCollaborator;

/// Parameters for one branch-generation call.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    /// Summary of the node being expanded.
    pub parent_summary: String,
    /// Pre-rendered context lines for the decision root.
    pub context: String,
    /// Levels still to be generated beneath this node.
    pub remaining_depth: u32,
    /// Number of distinct branches requested.
    pub count: u32,
    /// Extra instruction appended on retry.
    pub hint: Option<String>,
    /// Maximum time to wait for the collaborator.
    pub timeout: Duration,
}

/// Parameters for one annotation call.
#[derive(Debug, Clone)]
pub struct AnnotateRequest {
    pub summary: String,
    pub timeout: Duration,
}

/// Annotation labels exactly as the collaborator returned them, before
/// normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawAnnotation {
    pub risk: String,
    pub growth: String,
    pub emotion: String,
}

/// Abstraction over the text-generation backend.
pub trait Collaborator {
    /// Produce candidate child summaries in display order.
    fn generate(&self, request: &GenerateRequest) -> Result<Vec<String>>;

    /// Produce the raw tag set for one summary.
    fn annotate(&self, request: &AnnotateRequest) -> Result<RawAnnotation>;
}
