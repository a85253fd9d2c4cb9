//! Session persistence: one tree document per decision root.
//!
//! Layout: `<sessions_root>/<session-id>/tree.json`, where the document is
//! the same structured form the `json` exporter emits, so every load
//! exercises the import path (schema + invariants). Saves are atomic and
//! retried once; a final failure dumps the full in-memory tree to a
//! timestamped fallback document so no generated work is lost.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use crate::core::store::{StoreError, TreeStore};
use crate::core::types::Caps;
use crate::export::document;
use crate::export::ExportFormat;
use crate::tree::{ContextBlock, DecisionTree};

/// Canonical paths for one session.
#[derive(Debug, Clone)]
pub struct SessionPaths {
    pub sessions_root: PathBuf,
    pub session_dir: PathBuf,
    pub tree_path: PathBuf,
}

impl SessionPaths {
    pub fn new(sessions_root: impl Into<PathBuf>, session: &str) -> Self {
        let sessions_root = sessions_root.into();
        let session_dir = sessions_root.join(session);
        Self {
            tree_path: session_dir.join("tree.json"),
            session_dir,
            sessions_root,
        }
    }
}

/// Raised when a session document cannot be persisted even after retry.
///
/// Carries the fallback snapshot path when one could be written; callers
/// map this onto the store-failure exit code.
#[derive(Debug, Error)]
#[error("failed to persist session '{session}'")]
pub struct PersistFailure {
    pub session: String,
    pub fallback: Option<PathBuf>,
}

/// Default sessions root: `$HOME/.lifetree/sessions`.
pub fn default_sessions_root() -> PathBuf {
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(".lifetree").join("sessions"),
        None => PathBuf::from(".lifetree").join("sessions"),
    }
}

/// Allocate the next free `session-<n>` id under `sessions_root`.
pub fn allocate_session_id(sessions_root: &Path) -> Result<String> {
    for n in 1..=9999u32 {
        let id = format!("session-{n}");
        if !SessionPaths::new(sessions_root, &id).tree_path.exists() {
            return Ok(id);
        }
    }
    Err(anyhow!(
        "unable to allocate a session id under {} (too many existing sessions)",
        sessions_root.display()
    ))
}

/// Create a new session with its root node and persist the initial document.
///
/// Fails with [`StoreError::DuplicateRoot`] if a tree already exists for
/// `session`.
pub fn create_root(
    sessions_root: &Path,
    session: &str,
    statement: &str,
    timeframe: Option<i32>,
    context: ContextBlock,
    caps: Caps,
) -> Result<TreeStore> {
    let paths = SessionPaths::new(sessions_root, session);
    if paths.tree_path.exists() {
        return Err(StoreError::DuplicateRoot {
            session: session.to_string(),
        }
        .into());
    }
    fs::create_dir_all(&paths.session_dir)
        .with_context(|| format!("create session dir {}", paths.session_dir.display()))?;

    let store = TreeStore::create_root(session, statement, timeframe, context, caps);
    save_session(sessions_root, &store)?;
    info!(session, "session created");
    Ok(store)
}

/// Load a session's tree (schema + invariant validation on the way in).
pub fn load_session(sessions_root: &Path, session: &str, caps: Caps) -> Result<TreeStore> {
    let paths = SessionPaths::new(sessions_root, session);
    if !paths.tree_path.exists() {
        return Err(anyhow!(
            "no session '{session}' under {}",
            sessions_root.display()
        ));
    }
    let contents = fs::read_to_string(&paths.tree_path)
        .with_context(|| format!("read tree {}", paths.tree_path.display()))?;
    let tree = document::parse_json(&contents)
        .with_context(|| format!("load tree {}", paths.tree_path.display()))?;
    if tree.session() != session {
        return Err(anyhow!(
            "session mismatch: directory '{session}' holds a tree for '{}'",
            tree.session()
        ));
    }
    debug!(session, nodes = tree.node_count(), "session loaded");
    Ok(TreeStore::open(tree, caps))
}

/// Persist a session document atomically, retrying once.
///
/// On a second failure the full in-memory tree is dumped to a timestamped
/// fallback document (best effort) and a [`PersistFailure`] is returned.
pub fn save_session(sessions_root: &Path, store: &TreeStore) -> Result<()> {
    let session = store.tree().session().to_string();
    let paths = SessionPaths::new(sessions_root, &session);
    let rendered = document::render_json(store.tree())?;

    let first = write_atomic(&paths.tree_path, &rendered);
    let Err(first_err) = first else {
        return Ok(());
    };
    warn!(session, err = %first_err, "session write failed, retrying once");

    if let Err(retry_err) = write_atomic(&paths.tree_path, &rendered) {
        let fallback = write_fallback(&paths, &rendered);
        warn!(session, err = %retry_err, fallback = ?fallback, "session write failed after retry");
        return Err(anyhow::Error::new(PersistFailure { session, fallback })
            .context(retry_err));
    }
    Ok(())
}

/// Write a timestamped export document into the session directory.
///
/// Used by `launch --export`: one document per run, named
/// `session_<timestamp>.<ext>`.
pub fn write_session_export(
    sessions_root: &Path,
    tree: &DecisionTree,
    format: ExportFormat,
) -> Result<PathBuf> {
    let paths = SessionPaths::new(sessions_root, tree.session());
    let rendered = crate::export::render(tree, format)?;
    let path = paths
        .session_dir
        .join(format!("session_{}.{}", timestamp(), format.extension()));
    fs::write(&path, rendered).with_context(|| format!("write export {}", path.display()))?;
    Ok(path)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("tree path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp tree {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace tree {}", path.display()))?;
    Ok(())
}

fn write_fallback(paths: &SessionPaths, rendered: &str) -> Option<PathBuf> {
    let path = paths
        .session_dir
        .join(format!("fallback_{}.json", timestamp()));
    match fs::write(&path, rendered) {
        Ok(()) => Some(path),
        Err(err) => {
            warn!(err = %err, "fallback snapshot write failed");
            None
        }
    }
}

/// Filename-safe UTC stamp, `YYYYMMDD_HHMMSS`.
fn timestamp() -> String {
    let now = OffsetDateTime::now_utc();
    format!(
        "{:04}{:02}{:02}_{:02}{:02}{:02}",
        now.year(),
        u8::from(now.month()),
        now.day(),
        now.hour(),
        now.minute(),
        now.second()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_context;

    fn create_sample(root: &Path) -> TreeStore {
        create_root(
            root,
            "session-1",
            "Move to Berlin in 2023",
            None,
            sample_context(),
            Caps::default(),
        )
        .expect("create")
    }

    #[test]
    fn create_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = create_sample(temp.path());
        let loaded = load_session(temp.path(), "session-1", Caps::default()).expect("load");
        assert_eq!(loaded.tree(), store.tree());
    }

    #[test]
    fn duplicate_root_is_rejected_without_touching_state() {
        let temp = tempfile::tempdir().expect("tempdir");
        create_sample(temp.path());
        let err = create_root(
            temp.path(),
            "session-1",
            "Different statement",
            None,
            ContextBlock::default(),
            Caps::default(),
        )
        .expect_err("duplicate");
        let store_err = err.downcast_ref::<StoreError>().expect("typed");
        assert!(matches!(store_err, StoreError::DuplicateRoot { .. }));

        // The original document is untouched.
        let loaded = load_session(temp.path(), "session-1", Caps::default()).expect("load");
        assert_eq!(loaded.tree().statement(), "Move to Berlin in 2023");
    }

    #[test]
    fn load_unknown_session_errors() {
        let temp = tempfile::tempdir().expect("tempdir");
        let err = load_session(temp.path(), "session-9", Caps::default()).expect_err("missing");
        assert!(err.to_string().contains("no session 'session-9'"));
    }

    #[test]
    fn session_ids_skip_existing_directories() {
        let temp = tempfile::tempdir().expect("tempdir");
        assert_eq!(
            allocate_session_id(temp.path()).expect("first"),
            "session-1"
        );
        create_sample(temp.path());
        assert_eq!(
            allocate_session_id(temp.path()).expect("second"),
            "session-2"
        );
    }

    #[test]
    fn failed_save_writes_fallback_snapshot() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = create_sample(temp.path());

        // Turn tree.json into a directory so the rename cannot succeed.
        let paths = SessionPaths::new(temp.path(), "session-1");
        fs::remove_file(&paths.tree_path).expect("remove");
        fs::create_dir(&paths.tree_path).expect("block path");

        let err = save_session(temp.path(), &store).expect_err("save should fail");
        let failure = err.downcast_ref::<PersistFailure>().expect("typed failure");
        assert_eq!(failure.session, "session-1");
        let fallback = failure.fallback.as_ref().expect("fallback written");
        let dumped = fs::read_to_string(fallback).expect("read fallback");
        let rebuilt = document::parse_json(&dumped).expect("fallback parses");
        assert_eq!(rebuilt, *store.tree());
    }

    #[test]
    fn mismatched_session_directory_is_rejected() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = create_sample(temp.path());
        let other = SessionPaths::new(temp.path(), "session-2");
        fs::create_dir_all(&other.session_dir).expect("dir");
        fs::write(
            &other.tree_path,
            document::render_json(store.tree()).expect("render"),
        )
        .expect("write");

        let err = load_session(temp.path(), "session-2", Caps::default()).expect_err("mismatch");
        assert!(err.to_string().contains("session mismatch"));
    }
}
