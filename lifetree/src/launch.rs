//! Orchestration for a full session: create the decision root with its
//! context, expand the tree, and optionally export a timestamped document
//! into the session directory.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use tracing::info;

use crate::core::types::ExpansionReport;
use crate::expand::expand_store;
use crate::export::ExportFormat;
use crate::io::config::AppConfig;
use crate::io::session_store::{
    allocate_session_id, create_root, save_session, write_session_export,
};
use crate::llm::Collaborator;
use crate::tree::{ContextBlock, ContextDomain};

/// Inputs for one `launch` invocation.
#[derive(Debug, Clone)]
pub struct LaunchParams {
    pub statement: String,
    pub timeframe: Option<i32>,
    pub context: ContextBlock,
    pub depth: u32,
    pub children: u32,
    pub export: Option<ExportFormat>,
}

/// Outcome of one `launch` invocation.
#[derive(Debug)]
pub struct LaunchOutcome {
    pub session: String,
    pub report: ExpansionReport,
    pub export_path: Option<PathBuf>,
}

/// Create a fresh session and expand it.
pub fn launch<C: Collaborator>(
    cfg: &AppConfig,
    sessions_root: &Path,
    collaborator: &C,
    params: &LaunchParams,
) -> Result<LaunchOutcome> {
    if params.statement.trim().is_empty() {
        return Err(anyhow!("statement must not be empty"));
    }

    let session = allocate_session_id(sessions_root)?;
    let mut store = create_root(
        sessions_root,
        &session,
        params.statement.trim(),
        params.timeframe,
        params.context.clone(),
        cfg.caps(),
    )?;

    let report = expand_store(cfg, collaborator, &mut store, params.depth, params.children)?;
    save_session(sessions_root, &store)?;

    let export_path = match params.export {
        Some(format) => Some(write_session_export(sessions_root, store.tree(), format)?),
        None => None,
    };

    info!(
        session,
        nodes = store.node_count(),
        export = ?export_path,
        "launch finished"
    );
    Ok(LaunchOutcome {
        session,
        report,
        export_path,
    })
}

/// Read a context file: a TOML table of domain keys to plain strings.
///
/// The literal value `"skipped"` maps to the explicit skip sentinel;
/// unknown keys are rejected.
pub fn read_context_file(path: &Path) -> Result<ContextBlock> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("read context file {}", path.display()))?;
    parse_context(&contents).with_context(|| format!("parse context file {}", path.display()))
}

fn parse_context(contents: &str) -> Result<ContextBlock> {
    let raw: BTreeMap<String, String> = toml::from_str(contents).context("parse context toml")?;
    let mut entries = Vec::with_capacity(raw.len());
    for (key, value) in raw {
        let domain = ContextDomain::from_key(&key)
            .ok_or_else(|| anyhow!("unknown context domain '{key}'"))?;
        entries.push((domain, value));
    }
    Ok(ContextBlock::from_plain(entries))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::ExpansionStatus;
    use crate::io::session_store::load_session;
    use crate::test_support::{ScriptedCollaborator, sample_context};
    use crate::tree::ContextEntry;

    fn params(export: Option<ExportFormat>) -> LaunchParams {
        LaunchParams {
            statement: "Move to Berlin in 2023".to_string(),
            timeframe: None,
            context: sample_context(),
            depth: 2,
            children: 2,
            export,
        }
    }

    #[test]
    fn launch_creates_expands_and_persists() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = AppConfig::default();
        let collab = ScriptedCollaborator::reliable();

        let outcome = launch(&cfg, temp.path(), &collab, &params(None)).expect("launch");
        assert_eq!(outcome.session, "session-1");
        assert_eq!(outcome.report.status(), ExpansionStatus::Completed);
        assert!(outcome.export_path.is_none());

        let store = load_session(temp.path(), "session-1", cfg.caps()).expect("load");
        assert_eq!(store.node_count(), 7);
        assert_eq!(store.tree().timeframe(), Some(2023));
    }

    #[test]
    fn launch_with_export_writes_one_document_per_run() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = AppConfig::default();
        let collab = ScriptedCollaborator::reliable();

        let outcome = launch(&cfg, temp.path(), &collab, &params(Some(ExportFormat::Markdown)))
            .expect("launch");
        let export_path = outcome.export_path.expect("export path");
        assert!(export_path.extension().is_some_and(|e| e == "md"));
        let rendered = fs::read_to_string(&export_path).expect("read export");
        assert!(rendered.starts_with("# Decision Tree: Move to Berlin in 2023"));
    }

    #[test]
    fn consecutive_launches_get_distinct_sessions() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = AppConfig::default();
        let collab = ScriptedCollaborator::reliable();

        let first = launch(&cfg, temp.path(), &collab, &params(None)).expect("first");
        let second = launch(&cfg, temp.path(), &collab, &params(None)).expect("second");
        assert_eq!(first.session, "session-1");
        assert_eq!(second.session, "session-2");
    }

    #[test]
    fn rejects_blank_statement() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = AppConfig::default();
        let collab = ScriptedCollaborator::reliable();
        let mut bad = params(None);
        bad.statement = "   ".to_string();
        assert!(launch(&cfg, temp.path(), &collab, &bad).is_err());
    }

    #[test]
    fn context_file_parses_domains_and_skip_sentinel() {
        let parsed = parse_context(
            "career = \"engineer\"\nfinances = \"skipped\"\nmental_state = \"curious\"\n",
        )
        .expect("parse");
        assert_eq!(
            parsed.get(ContextDomain::Career),
            Some(&ContextEntry::Answered("engineer".into()))
        );
        assert_eq!(parsed.get(ContextDomain::Finances), Some(&ContextEntry::Skipped));
        assert_eq!(parsed.get(ContextDomain::MetaNotes), None);

        let err = parse_context("hobbies = \"chess\"\n").expect_err("unknown key");
        assert!(err.to_string().contains("unknown context domain 'hobbies'"));
    }
}
