//! CLI for the bounded what-if decision tree explorer.
//!
//! Thin dispatch over the library: each command loads config, resolves the
//! sessions root, runs the matching orchestration module, and maps typed
//! failures onto stable exit codes. Degraded expansions (capped fan-out,
//! missing annotations) exit 0 with warnings on stderr.

use std::fs;
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use lifetree::core::types::ExpansionReport;
use lifetree::exit_codes;
use lifetree::expand::run_expansion;
use lifetree::export::{self, ExportFormat};
use lifetree::io::config::{AppConfig, load_config};
use lifetree::io::session_store::{PersistFailure, default_sessions_root, load_session};
use lifetree::launch::{LaunchParams, launch, read_context_file};
use lifetree::llm::CommandCollaborator;
use lifetree::logging;
use lifetree::tree::ContextBlock;

#[derive(Parser)]
#[command(
    name = "lifetree",
    version,
    about = "Bounded what-if decision tree explorer"
)]
struct Cli {
    /// Config file path (defaults to ~/.lifetree/config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Sessions directory (defaults to ~/.lifetree/sessions).
    #[arg(long, global = true)]
    sessions_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a session from a statement + context, expand it, optionally
    /// export a timestamped document.
    Launch {
        /// The decision to explore, e.g. "Move to Berlin in 2023".
        statement: String,
        /// TOML file mapping context domains to answers ("skipped" marks a
        /// declined domain).
        #[arg(long)]
        context: Option<PathBuf>,
        /// Timeframe year; inferred from the statement when omitted.
        #[arg(long)]
        timeframe: Option<i32>,
        /// Levels to generate beneath the root.
        #[arg(short, long)]
        depth: Option<u32>,
        /// Children requested per node.
        #[arg(short, long)]
        children: Option<u32>,
        /// Export the tree into the session directory after expansion.
        #[arg(short, long, value_enum)]
        export: Option<ExportFormat>,
    },
    /// Expand an existing session by further levels.
    Expand {
        /// Session id, e.g. "session-1".
        root_id: String,
        #[arg(short, long)]
        depth: Option<u32>,
        #[arg(short, long)]
        children: Option<u32>,
    },
    /// Print a session's tree.
    Show {
        root_id: String,
    },
    /// Export a session's tree to a file.
    Export {
        root_id: String,
        path: PathBuf,
        #[arg(short, long, value_enum, default_value_t = ExportFormat::Markdown)]
        format: ExportFormat,
    },
    /// Check a session document against the schema and tree invariants.
    Validate {
        root_id: String,
    },
}

fn main() {
    logging::init();
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => process::exit(exit_codes::OK),
        Err(err) => {
            eprintln!("{:#}", err);
            let code = match err.downcast_ref::<PersistFailure>() {
                Some(failure) => {
                    if let Some(fallback) = &failure.fallback {
                        eprintln!("fallback snapshot written to {}", fallback.display());
                    }
                    exit_codes::STORE_FAILURE
                }
                None => exit_codes::INVALID,
            };
            process::exit(code);
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let cfg = load_config(&config_path)?;
    let sessions_root = cli
        .sessions_dir
        .clone()
        .or_else(|| cfg.sessions_dir.clone())
        .unwrap_or_else(default_sessions_root);

    match cli.command {
        Command::Launch {
            statement,
            context,
            timeframe,
            depth,
            children,
            export,
        } => {
            let context = match context {
                Some(path) => read_context_file(&path)?,
                None => ContextBlock::default(),
            };
            let params = LaunchParams {
                statement,
                timeframe,
                context,
                depth: depth.unwrap_or(cfg.default_depth),
                children: children.unwrap_or(cfg.default_children),
                export,
            };
            let collaborator = collaborator(&cfg);
            let outcome = launch(&cfg, &sessions_root, &collaborator, &params)?;
            print_report(&outcome.report);
            println!("Session created: {}", outcome.session);
            if let Some(path) = outcome.export_path {
                println!("Exported to {}", path.display());
            }
            Ok(())
        }
        Command::Expand {
            root_id,
            depth,
            children,
        } => {
            let collaborator = collaborator(&cfg);
            let outcome = run_expansion(
                &cfg,
                &sessions_root,
                &collaborator,
                &root_id,
                depth.unwrap_or(cfg.default_depth),
                children.unwrap_or(cfg.default_children),
            )?;
            print_report(&outcome.report);
            println!(
                "Expanded {}: {} nodes created, {} annotated",
                outcome.session, outcome.report.nodes_created, outcome.report.nodes_annotated
            );
            Ok(())
        }
        Command::Show { root_id } => {
            let store = load_session(&sessions_root, &root_id, cfg.caps())?;
            print!("{}", export::render(store.tree(), ExportFormat::Markdown)?);
            Ok(())
        }
        Command::Export {
            root_id,
            path,
            format,
        } => {
            let store = load_session(&sessions_root, &root_id, cfg.caps())?;
            let rendered = export::render(store.tree(), format)?;
            fs::write(&path, rendered)
                .with_context(|| format!("write export {}", path.display()))?;
            println!("Exported {root_id} to {} ({format})", path.display());
            Ok(())
        }
        Command::Validate { root_id } => {
            let store = load_session(&sessions_root, &root_id, cfg.caps())?;
            println!("ok: {} nodes", store.node_count());
            Ok(())
        }
    }
}

fn collaborator(cfg: &AppConfig) -> CommandCollaborator {
    CommandCollaborator::new(
        cfg.collaborator.command.clone(),
        cfg.collaborator.output_limit_bytes,
    )
}

fn print_report(report: &ExpansionReport) {
    for notice in &report.notices {
        eprintln!("warning: {notice}");
    }
}

fn default_config_path() -> PathBuf {
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(".lifetree").join("config.toml"),
        None => PathBuf::from(".lifetree").join("config.toml"),
    }
}
