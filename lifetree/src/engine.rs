//! Depth-first tree expansion.
//!
//! One expansion call walks from a target node, generating and persisting
//! up to `depth` additional levels beneath it. Caps are checked before any
//! collaborator call (fail fast), child batches are written atomically, and
//! every reduced-fidelity event is collected into an [`ExpansionReport`]
//! instead of failing the call. Traversal is depth-first, left-to-right by
//! creation rank, so hitting a cap mid-walk always leaves a left-complete,
//! right-truncated tree.

use std::time::{Duration, Instant};

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::core::budget::remaining_budget;
use crate::core::normalize;
use crate::core::store::{StoreError, TreeStore};
use crate::core::truncate::truncate_summary;
use crate::core::types::{ExpansionReport, Notice};
use crate::llm::{AnnotateRequest, Collaborator, GenerateRequest, prompt};
use crate::tree::NodeId;

/// Tunable knobs for one expansion call. Caps travel with the store.
#[derive(Debug, Clone)]
pub struct ExpandParams {
    /// Additional levels to generate beneath the target node.
    pub depth: u32,
    /// Children requested per expanded node.
    pub children: u32,
    /// Character budget applied to stored summaries.
    pub summary_budget: usize,
    /// Per-collaborator-call timeout ceiling.
    pub call_timeout: Duration,
    /// Absolute deadline for the whole call.
    pub deadline: Instant,
}

/// Expand `target` by up to `params.depth` levels.
///
/// Structural errors (`NotFound` for the target) and collaborator-unrelated
/// store bugs abort with `Err`; soft conditions (caps, thin branches,
/// missing annotations, deadline) land in the report's notices.
pub fn expand_node<C: Collaborator>(
    store: &mut TreeStore,
    collaborator: &C,
    target: NodeId,
    params: &ExpandParams,
) -> Result<ExpansionReport> {
    let mut report = ExpansionReport::new(target);
    let target_node = store.node(target)?;
    let caps = store.caps();

    info!(
        target = %target,
        depth = params.depth,
        children = params.children,
        "starting expansion"
    );

    // Preflight: never start a walk whose requested depth cannot legally be
    // written, and never call the collaborator for a tree already at cap.
    if target_node.depth + params.depth > caps.max_depth {
        report.notices.push(Notice::DepthLimit {
            node: target,
            requested: params.depth,
            max_depth: caps.max_depth,
        });
        return Ok(report);
    }

    let context = prompt::context_lines(store.tree().context());
    expand_inner(store, collaborator, &context, target, params.depth, params, &mut report)?;

    info!(
        nodes_created = report.nodes_created,
        nodes_annotated = report.nodes_annotated,
        notices = report.notices.len(),
        "expansion finished"
    );
    Ok(report)
}

fn expand_inner<C: Collaborator>(
    store: &mut TreeStore,
    collaborator: &C,
    context: &str,
    node: NodeId,
    remaining: u32,
    params: &ExpandParams,
    report: &mut ExpansionReport,
) -> Result<()> {
    if remaining == 0 || report.stopped() {
        return Ok(());
    }

    // Re-invoking on an already-expanded node must not re-expand it; descend
    // beneath the existing children instead.
    let existing = store.children_of(node)?.to_vec();
    if !existing.is_empty() {
        debug!(node = %node, "node already expanded, descending");
        for child in existing {
            expand_inner(store, collaborator, context, child, remaining - 1, params, report)?;
            if report.stopped() {
                return Ok(());
            }
        }
        return Ok(());
    }

    if store.node_count() >= store.caps().max_nodes {
        report.notices.push(Notice::NodeCapReached { node });
        return Ok(());
    }

    let summaries = match generate_with_retry(collaborator, context, store, node, remaining, params, report)? {
        Some(summaries) => summaries,
        // Generation degraded to nothing, or the deadline expired; the
        // appropriate notice is already recorded.
        None => return Ok(()),
    };

    let created = match store.create_children(node, summaries) {
        Ok(ids) => ids,
        Err(err @ StoreError::CapExceeded { .. }) | Err(err @ StoreError::DepthExceeded { .. }) => {
            warn!(node = %node, %err, "child batch refused, tree capped");
            let requested = match &err {
                StoreError::CapExceeded { requested, .. } => *requested,
                _ => params.children as usize,
            };
            report.notices.push(Notice::Capped { node, requested });
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };
    report.nodes_created += created.len();
    debug!(node = %node, created = created.len(), "children materialized");

    for child in &created {
        annotate_best_effort(collaborator, store, *child, params, report)?;
    }

    for child in created {
        expand_inner(store, collaborator, context, child, remaining - 1, params, report)?;
        if report.stopped() {
            return Ok(());
        }
    }

    Ok(())
}

/// Call the generator, retrying once with a hint when the reply is thin.
///
/// Returns `None` when nothing usable was produced (notice recorded) or the
/// deadline expired.
fn generate_with_retry<C: Collaborator>(
    collaborator: &C,
    context: &str,
    store: &TreeStore,
    node: NodeId,
    remaining: u32,
    params: &ExpandParams,
    report: &mut ExpansionReport,
) -> Result<Option<Vec<String>>> {
    let parent_summary = store.node(node)?.summary.clone();
    let mut request = GenerateRequest {
        parent_summary,
        context: context.to_string(),
        remaining_depth: remaining,
        count: params.children,
        hint: None,
        timeout: params.call_timeout,
    };

    let Some(timeout) = call_budget(node, params, report) else {
        return Ok(None);
    };
    request.timeout = timeout;

    let mut summaries = match collaborator.generate(&request) {
        Ok(raw) => clean_summaries(raw, params),
        Err(err) => {
            warn!(node = %node, err = %err, "generation attempt failed");
            Vec::new()
        }
    };

    if summaries.len() < 2 {
        let Some(timeout) = call_budget(node, params, report) else {
            // Keep whatever the first attempt yielded; a thin branch beats
            // none, but the deadline notice still stops the walk.
            return Ok(finish_thin(summaries, node, params, report));
        };
        request.hint = Some(prompt::RETRY_HINT.to_string());
        request.timeout = timeout;
        debug!(node = %node, "retrying generation with hint");
        match collaborator.generate(&request) {
            Ok(raw) => {
                let retried = clean_summaries(raw, params);
                if retried.len() > summaries.len() {
                    summaries = retried;
                }
            }
            Err(err) => warn!(node = %node, err = %err, "generation retry failed"),
        }
    }

    if summaries.is_empty() {
        report.notices.push(Notice::GenerationFailed { node });
        return Ok(None);
    }
    if (summaries.len() as u32) < params.children {
        report.notices.push(Notice::ThinBranch {
            node,
            produced: summaries.len(),
            requested: params.children,
        });
    }
    Ok(Some(summaries))
}

fn finish_thin(
    summaries: Vec<String>,
    node: NodeId,
    params: &ExpandParams,
    report: &mut ExpansionReport,
) -> Option<Vec<String>> {
    if summaries.is_empty() {
        return None;
    }
    if (summaries.len() as u32) < params.children {
        report.notices.push(Notice::ThinBranch {
            node,
            produced: summaries.len(),
            requested: params.children,
        });
    }
    Some(summaries)
}

/// Drop blanks, truncate to the storage budget, and cap at the requested
/// fan-out.
fn clean_summaries(raw: Vec<String>, params: &ExpandParams) -> Vec<String> {
    raw.into_iter()
        .map(|s| truncate_summary(&s, params.summary_budget))
        .filter(|s| !s.is_empty())
        .take(params.children as usize)
        .collect()
}

/// Annotate one freshly created node, retrying once; failures leave the
/// node unannotated.
fn annotate_best_effort<C: Collaborator>(
    collaborator: &C,
    store: &mut TreeStore,
    node: NodeId,
    params: &ExpandParams,
    report: &mut ExpansionReport,
) -> Result<()> {
    let summary = store.node(node)?.summary.clone();

    for attempt in 0..2 {
        let Some(timeout) = call_budget(node, params, report) else {
            return Ok(());
        };
        let request = AnnotateRequest {
            summary: summary.clone(),
            timeout,
        };
        match collaborator.annotate(&request) {
            Ok(raw) => {
                store.attach_annotation(node, normalize::normalize(&raw))?;
                report.nodes_annotated += 1;
                return Ok(());
            }
            Err(err) => {
                warn!(node = %node, attempt, err = %err, "annotation attempt failed");
            }
        }
    }

    report.notices.push(Notice::AnnotationMissing { node });
    Ok(())
}

/// Time left for one collaborator call, bounded by the per-call ceiling.
///
/// Records the deadline notice (once) when the budget is spent.
fn call_budget(node: NodeId, params: &ExpandParams, report: &mut ExpansionReport) -> Option<Duration> {
    match remaining_budget(params.deadline) {
        Some(remaining) => Some(remaining.min(params.call_timeout)),
        None => {
            if !report
                .notices
                .iter()
                .any(|n| matches!(n, Notice::DeadlineReached { .. }))
            {
                report.notices.push(Notice::DeadlineReached { node });
            }
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Caps, ExpansionStatus};
    use crate::test_support::{GenReply, ScriptedCollaborator, sample_context};
    use crate::tree::{Level, ROOT_ID};

    fn params(depth: u32, children: u32) -> ExpandParams {
        ExpandParams {
            depth,
            children,
            summary_budget: 480,
            call_timeout: Duration::from_secs(30),
            deadline: Instant::now() + Duration::from_secs(60),
        }
    }

    fn fresh_store(caps: Caps) -> TreeStore {
        TreeStore::create_root(
            "session-1",
            "Move to Berlin in 2023",
            None,
            sample_context(),
            caps,
        )
    }

    #[test]
    fn grounded_scenario_yields_seven_nodes() {
        let mut store = fresh_store(Caps::default());
        let collab = ScriptedCollaborator::reliable();

        let report = expand_node(&mut store, &collab, ROOT_ID, &params(2, 2)).expect("expand");

        assert_eq!(report.status(), ExpansionStatus::Completed);
        assert_eq!(report.nodes_created, 6);
        assert_eq!(report.nodes_annotated, 6);
        assert_eq!(store.node_count(), 7);

        let depths: Vec<u32> = store
            .tree()
            .nodes()
            .map(|node| node.depth)
            .collect();
        assert_eq!(depths.iter().filter(|&&d| d == 1).count(), 2);
        assert_eq!(depths.iter().filter(|&&d| d == 2).count(), 4);
        assert_eq!(depths.iter().max(), Some(&2));

        // Every depth-2 node is a leaf.
        for node in store.tree().nodes().filter(|n| n.depth == 2) {
            assert!(store.children_of(node.id).expect("children").is_empty());
        }
        // Created nodes carry normalized annotations; the root has none.
        for node in store.tree().nodes().filter(|n| n.id != ROOT_ID) {
            let annotation = node.annotation.as_ref().expect("annotated");
            assert_eq!(annotation.risk, Level::Medium);
            assert_eq!(annotation.growth, Level::High);
            assert_eq!(annotation.emotion, "Hopeful");
        }
    }

    #[test]
    fn re_expanding_a_terminal_tree_adds_nothing() {
        let mut store = fresh_store(Caps::default());
        let collab = ScriptedCollaborator::reliable();
        expand_node(&mut store, &collab, ROOT_ID, &params(2, 2)).expect("first");
        let calls_before = collab.generate_call_count();

        let report = expand_node(&mut store, &collab, ROOT_ID, &params(2, 2)).expect("second");

        assert_eq!(report.nodes_created, 0);
        assert_eq!(store.node_count(), 7);
        // The walk descends through the expanded nodes and runs out of
        // remaining depth exactly at the leaves: zero generation calls.
        assert_eq!(collab.generate_call_count(), calls_before);
        assert_eq!(report.status(), ExpansionStatus::Completed);
    }

    #[test]
    fn re_expanding_with_more_depth_grows_beneath_existing_leaves() {
        let mut store = fresh_store(Caps::default());
        let collab = ScriptedCollaborator::reliable();
        expand_node(&mut store, &collab, ROOT_ID, &params(1, 2)).expect("first");
        assert_eq!(store.node_count(), 3);

        let report = expand_node(&mut store, &collab, ROOT_ID, &params(2, 2)).expect("second");
        assert_eq!(report.nodes_created, 4);
        assert_eq!(store.node_count(), 7);
    }

    #[test]
    fn depth_preflight_stops_before_any_collaborator_call() {
        let mut store = fresh_store(Caps::default());
        let collab = ScriptedCollaborator::reliable();

        let report = expand_node(&mut store, &collab, ROOT_ID, &params(4, 2)).expect("expand");

        assert_eq!(report.nodes_created, 0);
        assert_eq!(collab.generate_call_count(), 0);
        assert!(matches!(
            report.notices.as_slice(),
            [Notice::DepthLimit { requested: 4, max_depth: 3, .. }]
        ));
    }

    #[test]
    fn node_cap_preflight_stops_before_any_collaborator_call() {
        let mut store = fresh_store(Caps {
            max_depth: 3,
            max_nodes: 1,
        });
        let collab = ScriptedCollaborator::reliable();

        let report = expand_node(&mut store, &collab, ROOT_ID, &params(1, 2)).expect("expand");

        assert_eq!(report.nodes_created, 0);
        assert_eq!(collab.generate_call_count(), 0);
        assert!(matches!(
            report.notices.as_slice(),
            [Notice::NodeCapReached { .. }]
        ));
    }

    #[test]
    fn cap_mid_traversal_leaves_left_complete_tree() {
        // Room for 6 nodes: root, both first-level children, both children
        // of the left branch; the right branch's batch no longer fits.
        let mut store = fresh_store(Caps {
            max_depth: 3,
            max_nodes: 6,
        });
        let collab = ScriptedCollaborator::reliable();

        let report = expand_node(&mut store, &collab, ROOT_ID, &params(2, 2)).expect("expand");

        assert_eq!(report.status(), ExpansionStatus::Degraded);
        assert_eq!(store.node_count(), 5);
        assert!(report.notices.iter().any(|n| matches!(n, Notice::Capped { .. })));

        let level1 = store.children_of(ROOT_ID).expect("children").to_vec();
        assert_eq!(level1.len(), 2);
        assert_eq!(store.children_of(level1[0]).expect("left").len(), 2);
        assert!(store.children_of(level1[1]).expect("right").is_empty());
    }

    #[test]
    fn thin_generation_retries_once_with_hint_and_accepts_one() {
        let mut store = fresh_store(Caps::default());
        let collab = ScriptedCollaborator::reliable();
        collab.push_generate(GenReply::Ok(vec!["only option".to_string()]));
        collab.push_generate(GenReply::Ok(vec!["still one".to_string()]));

        let report = expand_node(&mut store, &collab, ROOT_ID, &params(1, 2)).expect("expand");

        assert_eq!(report.nodes_created, 1);
        assert!(matches!(
            report.notices.as_slice(),
            [Notice::ThinBranch { produced: 1, requested: 2, .. }]
        ));
        let calls = collab.generate_calls.borrow();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].hint.is_none());
        assert!(calls[1].hint.is_some());
    }

    #[test]
    fn failed_generation_degrades_without_aborting() {
        let mut store = fresh_store(Caps::default());
        let collab = ScriptedCollaborator::reliable();
        collab.push_generate(GenReply::Fail("backend down"));
        collab.push_generate(GenReply::Fail("backend down"));

        let report = expand_node(&mut store, &collab, ROOT_ID, &params(1, 2)).expect("expand");

        assert_eq!(report.nodes_created, 0);
        assert_eq!(report.status(), ExpansionStatus::Degraded);
        assert!(matches!(
            report.notices.as_slice(),
            [Notice::GenerationFailed { .. }]
        ));
    }

    #[test]
    fn empty_first_attempt_recovers_on_retry() {
        let mut store = fresh_store(Caps::default());
        let collab = ScriptedCollaborator::reliable();
        collab.push_generate(GenReply::Ok(Vec::new()));
        // Retry falls through to the reliable default of two options.

        let report = expand_node(&mut store, &collab, ROOT_ID, &params(1, 2)).expect("expand");

        assert_eq!(report.nodes_created, 2);
        assert_eq!(report.status(), ExpansionStatus::Completed);
    }

    #[test]
    fn missing_annotations_leave_valid_nodes() {
        let mut store = fresh_store(Caps::default());
        let collab = ScriptedCollaborator::without_annotations();

        let report = expand_node(&mut store, &collab, ROOT_ID, &params(1, 2)).expect("expand");

        assert_eq!(report.nodes_created, 2);
        assert_eq!(report.nodes_annotated, 0);
        assert_eq!(
            report
                .notices
                .iter()
                .filter(|n| matches!(n, Notice::AnnotationMissing { .. }))
                .count(),
            2
        );
        // One retry per node.
        assert_eq!(collab.annotate_calls.borrow().len(), 4);
        for id in store.children_of(ROOT_ID).expect("children") {
            assert!(store.node(*id).expect("node").annotation.is_none());
        }
    }

    #[test]
    fn expired_deadline_reports_partial_completion() {
        let mut store = fresh_store(Caps::default());
        let collab = ScriptedCollaborator::reliable();
        let mut expired = params(2, 2);
        expired.deadline = Instant::now() - Duration::from_secs(1);

        let report = expand_node(&mut store, &collab, ROOT_ID, &expired).expect("expand");

        assert_eq!(report.nodes_created, 0);
        assert_eq!(collab.generate_call_count(), 0);
        assert!(matches!(
            report.notices.as_slice(),
            [Notice::DeadlineReached { .. }]
        ));
    }

    #[test]
    fn unknown_target_is_a_hard_error() {
        let mut store = fresh_store(Caps::default());
        let collab = ScriptedCollaborator::reliable();
        let err = expand_node(&mut store, &collab, NodeId(9), &params(1, 2))
            .expect_err("unknown target");
        assert!(err.to_string().contains("node 9 not found"));
    }
}
