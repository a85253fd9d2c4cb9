//! Application configuration stored as TOML.
//!
//! The file is intended to be edited by humans and must remain stable and
//! automatable. Missing file or fields fall back to defaults; every load
//! and write passes through `validate()`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::types::Caps;

/// Absolute ceilings the configurable caps may not exceed.
const MAX_DEPTH_CEILING: u32 = 3;
const MAX_NODES_CEILING: usize = 50;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    /// Maximum tree depth (root = 0). Configurable up to 3.
    pub max_depth: u32,

    /// Maximum total nodes per tree. Configurable up to 50.
    pub max_nodes: usize,

    /// Levels generated per expansion when the CLI gives no depth.
    pub default_depth: u32,

    /// Children requested per node when the CLI gives no count.
    pub default_children: u32,

    /// Character budget applied to stored summaries.
    pub summary_budget_chars: usize,

    /// Wall-clock budget for one whole expansion call, in seconds.
    pub expansion_timeout_secs: u64,

    /// Session documents live under this directory when set; otherwise
    /// `$HOME/.lifetree/sessions`.
    pub sessions_dir: Option<PathBuf>,

    pub collaborator: CollaboratorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CollaboratorConfig {
    /// Command to execute for generation/annotation calls; the prompt is
    /// written to its stdin and the completion read from stdout.
    pub command: Vec<String>,

    /// Per-call timeout in seconds.
    pub timeout_secs: u64,

    /// Truncate collaborator stdout/stderr beyond this many bytes.
    pub output_limit_bytes: usize,
}

impl Default for CollaboratorConfig {
    fn default() -> Self {
        Self {
            command: vec!["llm".to_string()],
            timeout_secs: 120,
            output_limit_bytes: 100_000,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            max_depth: 3,
            max_nodes: 50,
            default_depth: 2,
            default_children: 2,
            summary_budget_chars: 480,
            expansion_timeout_secs: 15 * 60,
            sessions_dir: None,
            collaborator: CollaboratorConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_depth == 0 || self.max_depth > MAX_DEPTH_CEILING {
            return Err(anyhow!(
                "max_depth must be in 1..={MAX_DEPTH_CEILING} (got {})",
                self.max_depth
            ));
        }
        if self.max_nodes == 0 || self.max_nodes > MAX_NODES_CEILING {
            return Err(anyhow!(
                "max_nodes must be in 1..={MAX_NODES_CEILING} (got {})",
                self.max_nodes
            ));
        }
        if self.default_depth == 0 || self.default_depth > self.max_depth {
            return Err(anyhow!(
                "default_depth must be in 1..={} (got {})",
                self.max_depth,
                self.default_depth
            ));
        }
        if self.default_children == 0 || self.default_children > 10 {
            return Err(anyhow!(
                "default_children must be in 1..=10 (got {})",
                self.default_children
            ));
        }
        if self.summary_budget_chars < 32 {
            return Err(anyhow!("summary_budget_chars must be at least 32"));
        }
        if self.expansion_timeout_secs == 0 {
            return Err(anyhow!("expansion_timeout_secs must be > 0"));
        }
        if self.collaborator.timeout_secs == 0 {
            return Err(anyhow!("collaborator.timeout_secs must be > 0"));
        }
        if self.collaborator.output_limit_bytes == 0 {
            return Err(anyhow!("collaborator.output_limit_bytes must be > 0"));
        }
        if self.collaborator.command.is_empty() || self.collaborator.command[0].trim().is_empty() {
            return Err(anyhow!("collaborator.command must be a non-empty array"));
        }
        Ok(())
    }

    pub fn caps(&self) -> Caps {
        Caps {
            max_depth: self.max_depth,
            max_nodes: self.max_nodes,
        }
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `AppConfig::default()`.
pub fn load_config(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        let cfg = AppConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: AppConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &AppConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, buf)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
