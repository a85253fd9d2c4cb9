//! Orchestration for expanding an existing session.
//!
//! Loads the session document, runs the engine from the root, and persists
//! the result (atomic save, one retry, fallback snapshot on failure).

use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::Result;

use crate::core::types::ExpansionReport;
use crate::engine::{self, ExpandParams};
use crate::io::config::AppConfig;
use crate::io::session_store::{load_session, save_session};
use crate::llm::Collaborator;
use crate::core::store::TreeStore;
use crate::tree::ROOT_ID;

/// Outcome of an `expand` invocation.
#[derive(Debug)]
pub struct ExpandOutcome {
    pub session: String,
    pub report: ExpansionReport,
}

/// Expand `session` by `depth` further levels and persist the tree.
pub fn run_expansion<C: Collaborator>(
    cfg: &AppConfig,
    sessions_root: &Path,
    collaborator: &C,
    session: &str,
    depth: u32,
    children: u32,
) -> Result<ExpandOutcome> {
    let mut store = load_session(sessions_root, session, cfg.caps())?;
    let report = expand_store(cfg, collaborator, &mut store, depth, children)?;
    save_session(sessions_root, &store)?;
    Ok(ExpandOutcome {
        session: session.to_string(),
        report,
    })
}

/// Run the engine from the root of an already-open store.
pub(crate) fn expand_store<C: Collaborator>(
    cfg: &AppConfig,
    collaborator: &C,
    store: &mut TreeStore,
    depth: u32,
    children: u32,
) -> Result<ExpansionReport> {
    let params = ExpandParams {
        depth,
        children,
        summary_budget: cfg.summary_budget_chars,
        call_timeout: Duration::from_secs(cfg.collaborator.timeout_secs),
        deadline: Instant::now() + Duration::from_secs(cfg.expansion_timeout_secs),
    };
    engine::expand_node(store, collaborator, ROOT_ID, &params)
}
