//! End-to-end session flow over a temporary sessions root.

use lifetree::core::types::{ExpansionStatus, Notice};
use lifetree::expand::run_expansion;
use lifetree::export::{self, ExportFormat, document};
use lifetree::io::config::AppConfig;
use lifetree::io::session_store::load_session;
use lifetree::launch::{LaunchParams, launch};
use lifetree::llm::RawAnnotation;
use lifetree::test_support::{AnnReply, ScriptedCollaborator, sample_context};
use lifetree::tree::Level;

fn launch_params(depth: u32, children: u32) -> LaunchParams {
    LaunchParams {
        statement: "Move to Berlin in 2023".to_string(),
        timeframe: None,
        context: sample_context(),
        depth,
        children,
        export: None,
    }
}

#[test]
fn launch_expand_export_round_trip() {
    let temp = tempfile::tempdir().expect("tempdir");
    let cfg = AppConfig::default();
    let collab = ScriptedCollaborator::reliable();

    // Launch: 1 + 2 + 4 nodes, everything annotated.
    let outcome = launch(&cfg, temp.path(), &collab, &launch_params(2, 2)).expect("launch");
    assert_eq!(outcome.report.status(), ExpansionStatus::Completed);
    let store = load_session(temp.path(), &outcome.session, cfg.caps()).expect("load");
    assert_eq!(store.node_count(), 7);

    // Re-expanding with the same parameters is idempotent.
    let again =
        run_expansion(&cfg, temp.path(), &collab, &outcome.session, 2, 2).expect("re-expand");
    assert_eq!(again.report.nodes_created, 0);

    // One level more grows beneath the existing leaves.
    let deeper =
        run_expansion(&cfg, temp.path(), &collab, &outcome.session, 3, 2).expect("deeper");
    assert_eq!(deeper.report.nodes_created, 8);
    let store = load_session(temp.path(), &outcome.session, cfg.caps()).expect("reload");
    assert_eq!(store.node_count(), 15);

    // Deterministic exports and a faithful document round-trip.
    for format in [ExportFormat::Markdown, ExportFormat::Mermaid, ExportFormat::Json] {
        let first = export::render(store.tree(), format).expect("render");
        let second = export::render(store.tree(), format).expect("render again");
        assert_eq!(first, second, "{format} export must be byte-identical");
    }
    let rendered = export::render(store.tree(), ExportFormat::Json).expect("json");
    let rebuilt = document::parse_json(&rendered).expect("round trip");
    assert_eq!(&rebuilt, store.tree());
}

#[test]
fn capped_launch_keeps_the_root_only() {
    let temp = tempfile::tempdir().expect("tempdir");
    let cfg = AppConfig {
        max_nodes: 3,
        ..AppConfig::default()
    };
    let collab = ScriptedCollaborator::reliable();

    let outcome = launch(&cfg, temp.path(), &collab, &launch_params(1, 3)).expect("launch");
    assert_eq!(outcome.report.status(), ExpansionStatus::Degraded);
    assert!(outcome
        .report
        .notices
        .iter()
        .any(|n| matches!(n, Notice::Capped { requested: 3, .. })));

    let store = load_session(temp.path(), &outcome.session, cfg.caps()).expect("load");
    assert_eq!(store.node_count(), 1);
    assert!(store.children_of(store.root()).expect("children").is_empty());
}

#[test]
fn unrecognized_risk_label_is_stored_as_unknown() {
    let temp = tempfile::tempdir().expect("tempdir");
    let cfg = AppConfig::default();
    let collab = ScriptedCollaborator::reliable();
    collab.push_annotate(AnnReply::Ok(RawAnnotation {
        risk: "Severe".to_string(),
        growth: "High".to_string(),
        emotion: "Anxious".to_string(),
    }));

    let outcome = launch(&cfg, temp.path(), &collab, &launch_params(1, 2)).expect("launch");
    assert_eq!(outcome.report.status(), ExpansionStatus::Completed);

    let store = load_session(temp.path(), &outcome.session, cfg.caps()).expect("load");
    let first_child = store.children_of(store.root()).expect("children")[0];
    let annotation = store
        .node(first_child)
        .expect("node")
        .annotation
        .clone()
        .expect("annotated");
    assert_eq!(annotation.risk, Level::Unknown);
    assert_eq!(annotation.growth, Level::High);
    assert_eq!(annotation.emotion, "Anxious");
}
