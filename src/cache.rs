//! Resolution cache and invalidation control
//!
//! Owns the one piece of mutable shared state in the engine: the last
//! accepted resolution result and its dirty flag. Mutation notifications
//! from the host mark the cache dirty; render queries share a single
//! recomputation per dirty period, while submission queries always
//! recompute fresh.

use crate::config::BroadcastSettings;
use crate::error::BroadcastError;
use crate::graph::NodeGraph;
use crate::loop_detect::detect_cycle;
use crate::node::NodeId;
use crate::payload::{apply_assignments, build_raw_payload, ExecutionPayload};
use crate::registry::build_broadcast_rules;
use crate::render::{project, RenderOverlay};
use crate::resolver::{resolve, MatchConflict, Resolution, VirtualLink};
use crate::snapshot::{read_snapshot, GraphSnapshot};
use std::collections::BTreeMap;

/// An accepted resolution pass. Owned exclusively by the controller;
/// consumers receive read-only views.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolutionResult {
    /// Winning virtual link per (node id, input name)
    pub assignments: BTreeMap<(NodeId, String), VirtualLink>,
    /// Tied-candidate diagnostics, surfaced only in detail mode
    pub conflicts: Vec<MatchConflict>,
    /// Mutation counter observed when this result was computed
    pub graph_version: u64,
}

impl ResolutionResult {
    fn new(resolution: Resolution, graph_version: u64) -> Self {
        Self {
            assignments: resolution.assignments,
            conflicts: resolution.conflicts,
            graph_version,
        }
    }

    /// Virtual links in deterministic (node id, input name) order
    pub fn virtual_links(&self) -> impl Iterator<Item = &VirtualLink> {
        self.assignments.values()
    }
}

/// Counters kept by the controller, mostly useful for asserting the cache
/// behaves (one recomputation per dirty period)
#[derive(Debug, Clone, Default)]
pub struct ControllerStats {
    /// Full resolution passes run
    pub recomputes: usize,
    /// Render queries answered from the cached result
    pub render_cache_hits: usize,
    /// Passes discarded because the augmented graph was cyclic
    pub rejected_cycles: usize,
    /// Submission queries turned away while one was in flight
    pub busy_rejections: usize,
}

/// Serializes recomputation over the host graph.
///
/// All analysis is pure; this controller is the only writer of the cached
/// result and dirty flag. Single-threaded: the engine runs on the editor's
/// event loop.
pub struct ResolutionController {
    cached: Option<ResolutionResult>,
    dirty: bool,
    version: u64,
    in_flight: bool,
    settings: BroadcastSettings,
    stats: ControllerStats,
}

impl ResolutionController {
    /// Create a controller. Starts dirty so the first query computes.
    pub fn new(settings: BroadcastSettings) -> Self {
        Self {
            cached: None,
            dirty: true,
            version: 0,
            in_flight: false,
            settings,
            stats: ControllerStats::default(),
        }
    }

    pub fn settings(&self) -> &BroadcastSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: BroadcastSettings) {
        self.settings = settings;
    }

    /// Note that the graph changed in some way. Idempotent: repeated calls
    /// while already dirty only bump the version counter.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
        self.version += 1;
    }

    // Subscriber interface for the host graph. Each notification maps to
    // exactly one mark_dirty; the host guarantees the graph is fully
    // initialized by the time on_node_created fires.

    pub fn on_connection_changed(&mut self) {
        self.mark_dirty();
    }

    pub fn on_node_removed(&mut self) {
        self.mark_dirty();
    }

    pub fn on_node_created(&mut self) {
        self.mark_dirty();
    }

    pub fn on_property_changed(&mut self) {
        self.mark_dirty();
    }

    pub fn on_graph_changed(&mut self) {
        self.mark_dirty();
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Last accepted result, if any
    pub fn cached(&self) -> Option<&ResolutionResult> {
        self.cached.as_ref()
    }

    pub fn stats(&self) -> &ControllerStats {
        &self.stats
    }

    /// Cheap per-frame query. Recomputes at most once per dirty period; a
    /// cyclic result never replaces the last accepted one, so the renderer
    /// keeps showing the pre-cycle state during interactive rewiring.
    pub fn query_for_render(&mut self, graph: &NodeGraph) -> RenderOverlay {
        if self.dirty {
            self.dirty = false;
            self.stats.recomputes += 1;
            let (snapshot, resolution) = analyse(graph);
            match detect_cycle(&snapshot, &resolution) {
                Some(report) => {
                    self.stats.rejected_cycles += 1;
                    log::warn!("keeping previous resolution: {}", report);
                }
                None => {
                    self.cached = Some(ResolutionResult::new(resolution, self.version));
                }
            }
        } else if self.cached.is_some() {
            self.stats.render_cache_hits += 1;
        }
        project(self.cached.as_ref(), self.settings.show_details)
    }

    /// Authoritative query: always recomputes, never reads the cache. On a
    /// cycle (with loop checking enabled) the pass is discarded wholesale.
    pub fn query_for_submission(&mut self, graph: &NodeGraph) -> Result<ResolutionResult, BroadcastError> {
        self.try_begin_submission()?;
        let outcome = self.analyse_for_submission(graph).map(|(_, result)| result);
        self.end_submission();
        outcome
    }

    /// Produce the augmented execution payload: the host's raw payload with
    /// every resolved input carrying its broadcast source. On a cycle the
    /// payload is never built, so nothing downstream can observe a
    /// partially-applied resolution.
    pub fn build_execution_payload(&mut self, graph: &NodeGraph) -> Result<ExecutionPayload, BroadcastError> {
        self.try_begin_submission()?;
        let outcome = self.analyse_for_submission(graph).map(|(snapshot, result)| {
            let raw = build_raw_payload(&snapshot);
            apply_assignments(raw, &result)
        });
        self.end_submission();
        outcome
    }

    /// Claim the single submission slot. Hosts that suspend between
    /// producing their raw snapshot and analysing it hold the slot across
    /// that boundary; a second submission request meanwhile is told to
    /// retry rather than produce divergent augmented snapshots.
    pub fn try_begin_submission(&mut self) -> Result<(), BroadcastError> {
        if self.in_flight {
            self.stats.busy_rejections += 1;
            return Err(BroadcastError::SubmissionBusy);
        }
        self.in_flight = true;
        Ok(())
    }

    /// Release the submission slot. Abandoning an in-flight submission
    /// needs nothing more; no state was mutated.
    pub fn end_submission(&mut self) {
        self.in_flight = false;
    }

    fn analyse_for_submission(
        &mut self,
        graph: &NodeGraph,
    ) -> Result<(GraphSnapshot, ResolutionResult), BroadcastError> {
        self.stats.recomputes += 1;
        let (snapshot, resolution) = analyse(graph);
        if self.settings.check_loops {
            if let Some(report) = detect_cycle(&snapshot, &resolution) {
                self.stats.rejected_cycles += 1;
                log::warn!("submission rejected: {}", report);
                return Err(BroadcastError::CycleDetected(report));
            }
        }
        Ok((snapshot, ResolutionResult::new(resolution, self.version)))
    }
}

impl Default for ResolutionController {
    fn default() -> Self {
        Self::new(BroadcastSettings::default())
    }
}

/// One full analysis pass: snapshot, registry, resolve
fn analyse(graph: &NodeGraph) -> (GraphSnapshot, Resolution) {
    let snapshot = read_snapshot(graph);
    let rules = build_broadcast_rules(&snapshot.nodes);
    let resolution = resolve(&snapshot.nodes, &rules);
    (snapshot, resolution)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{BroadcastProperties, Node};
    use crate::payload::PayloadInput;

    fn broadcast_graph() -> NodeGraph {
        let mut graph = NodeGraph::new();
        let mut caster = Node::new(0, "Anywhere").with_broadcast(BroadcastProperties::default());
        caster.add_output("value", "number");
        graph.add_node(caster);
        let mut sink = Node::new(0, "Sink");
        sink.add_input("value", "number");
        graph.add_node(sink);
        graph
    }

    /// Wire the sink's output back into the broadcaster so the virtual link
    /// closes a loop
    fn add_feedback(graph: &mut NodeGraph) {
        graph.nodes.get_mut(&0).unwrap().add_input("feedback", "number");
        graph.nodes.get_mut(&1).unwrap().add_output("result", "number");
        graph.add_connection_by_ids(1, 0, 0, 0).unwrap();
    }

    #[test]
    fn test_render_recomputes_once_per_dirty_period() {
        // Scenario: five notifications, three frames
        let graph = broadcast_graph();
        let mut controller = ResolutionController::default();

        for _ in 0..5 {
            controller.mark_dirty();
        }
        let first = controller.query_for_render(&graph);
        let second = controller.query_for_render(&graph);
        let third = controller.query_for_render(&graph);

        assert_eq!(controller.stats().recomputes, 1);
        assert_eq!(controller.stats().render_cache_hits, 2);
        assert_eq!(first, second);
        assert_eq!(second, third);
        assert_eq!(first.links_for(1).len(), 1);
    }

    #[test]
    fn test_each_notification_marks_dirty() {
        let mut controller = ResolutionController::default();
        let before = controller.version();
        controller.on_connection_changed();
        controller.on_node_removed();
        controller.on_node_created();
        controller.on_property_changed();
        controller.on_graph_changed();
        assert!(controller.is_dirty());
        assert_eq!(controller.version(), before + 5);
    }

    #[test]
    fn test_submission_always_recomputes_fresh() {
        let mut graph = broadcast_graph();
        let mut controller = ResolutionController::default();

        let overlay = controller.query_for_render(&graph);
        assert_eq!(overlay.links_for(1).len(), 1);

        // mutate without notifying: render stays stale, submission sees it
        graph.nodes.get_mut(&0).unwrap().bypassed = true;
        let stale = controller.query_for_render(&graph);
        assert_eq!(stale.links_for(1).len(), 1);

        let fresh = controller.query_for_submission(&graph).unwrap();
        assert!(fresh.assignments.is_empty());
    }

    #[test]
    fn test_cycle_keeps_last_known_good_for_render() {
        let mut graph = broadcast_graph();
        let mut controller = ResolutionController::default();

        let good = controller.query_for_render(&graph);
        assert_eq!(good.links_for(1).len(), 1);

        add_feedback(&mut graph);
        controller.on_connection_changed();
        let after_cycle = controller.query_for_render(&graph);

        // previous accepted resolution still shown, not blanked out
        assert_eq!(after_cycle.links_for(1).len(), 1);
        assert_eq!(controller.stats().rejected_cycles, 1);
        assert_eq!(controller.stats().recomputes, 2);
        assert!(!controller.is_dirty());
    }

    #[test]
    fn test_cycle_blocks_submission_and_payload() {
        let mut graph = broadcast_graph();
        add_feedback(&mut graph);
        let mut controller = ResolutionController::default();

        let err = controller.query_for_submission(&graph).unwrap_err();
        assert!(matches!(err, BroadcastError::CycleDetected(_)));

        let err = controller.build_execution_payload(&graph).unwrap_err();
        let BroadcastError::CycleDetected(report) = err else {
            panic!("expected cycle");
        };
        assert_eq!(report.virtual_edges, vec![(0, 1)]);
    }

    #[test]
    fn test_check_loops_disabled_applies_cyclic_links() {
        let mut graph = broadcast_graph();
        add_feedback(&mut graph);
        let mut controller = ResolutionController::new(BroadcastSettings {
            check_loops: false,
            ..Default::default()
        });

        let result = controller.query_for_submission(&graph).unwrap();
        assert_eq!(result.assignments.len(), 1);

        let payload = controller.build_execution_payload(&graph).unwrap();
        assert_eq!(
            payload.nodes[&1].inputs["value"],
            PayloadInput::Broadcast {
                upstream_node: 0,
                upstream_output: "value".to_string(),
            }
        );
    }

    #[test]
    fn test_busy_submission_is_rejected_then_recovers() {
        let graph = broadcast_graph();
        let mut controller = ResolutionController::default();

        controller.try_begin_submission().unwrap();
        let err = controller.query_for_submission(&graph).unwrap_err();
        assert_eq!(err, BroadcastError::SubmissionBusy);
        assert_eq!(controller.stats().busy_rejections, 1);

        controller.end_submission();
        assert!(controller.query_for_submission(&graph).is_ok());
    }

    #[test]
    fn test_result_records_version_at_compute_time() {
        let graph = broadcast_graph();
        let mut controller = ResolutionController::default();

        controller.mark_dirty();
        controller.mark_dirty();
        let version = controller.version();
        let result = controller.query_for_submission(&graph).unwrap();
        assert_eq!(result.graph_version, version);
    }

    #[test]
    fn test_augmented_payload_carries_broadcast_sources() {
        let graph = broadcast_graph();
        let mut controller = ResolutionController::default();

        let payload = controller.build_execution_payload(&graph).unwrap();
        assert_eq!(
            payload.nodes[&1].inputs["value"],
            PayloadInput::Broadcast {
                upstream_node: 0,
                upstream_output: "value".to_string(),
            }
        );
        // the broadcaster itself is part of the payload, untouched
        assert!(payload.nodes[&0].inputs.is_empty());
    }
}
