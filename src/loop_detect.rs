//! Loop detection over the augmented graph
//!
//! Runs after resolution: the dependency graph is every real connection
//! between live nodes plus every synthesized virtual link. Any cycle blocks
//! the submission pass; the report separates out which cycle edges were
//! virtual so the offending broadcasts can be named to the user.

use crate::node::NodeId;
use crate::resolver::Resolution;
use crate::snapshot::GraphSnapshot;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;

/// A cycle found in the augmented graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// The cycle as an ordered chain; the last node links back to the first
    pub nodes: Vec<NodeId>,
    /// Cycle edges (upstream, downstream) that are virtual links, i.e. the
    /// offending broadcasts. Empty if the cycle is made of real links only.
    pub virtual_edges: Vec<(NodeId, NodeId)>,
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "loop (")?;
        for id in &self.nodes {
            write!(f, "{} -> ", id)?;
        }
        match self.nodes.first() {
            Some(first) => write!(f, "{})", first)?,
            None => write!(f, ")")?,
        }
        if !self.virtual_edges.is_empty() {
            let broadcasts: Vec<String> = self
                .virtual_edges
                .iter()
                .map(|(from, to)| format!("{} -> {}", from, to))
                .collect();
            write!(f, " with broadcast ({})", broadcasts.join(", "))?;
        }
        Ok(())
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Visit {
    InStack,
    Done,
}

/// Searches the augmented graph for a cycle.
///
/// Edges run upstream to downstream. Traversal order is ascending node id,
/// so the first cycle reported is deterministic for a given snapshot.
pub fn detect_cycle(snapshot: &GraphSnapshot, resolution: &Resolution) -> Option<CycleReport> {
    let mut adjacency: BTreeMap<NodeId, BTreeSet<NodeId>> = BTreeMap::new();
    let mut virtual_set: HashSet<(NodeId, NodeId)> = HashSet::new();

    for node in &snapshot.nodes {
        adjacency.entry(node.id).or_default();
    }
    for conn in &snapshot.connections {
        adjacency.entry(conn.from_node).or_default().insert(conn.to_node);
    }
    for link in resolution.links() {
        adjacency
            .entry(link.upstream_node)
            .or_default()
            .insert(link.downstream_node);
        virtual_set.insert((link.upstream_node, link.downstream_node));
    }

    let roots: Vec<NodeId> = adjacency.keys().copied().collect();
    let mut visited: HashMap<NodeId, Visit> = HashMap::new();
    let mut stack: Vec<NodeId> = Vec::new();

    for root in roots {
        if visited.contains_key(&root) {
            continue;
        }
        if let Some(nodes) = visit(root, &adjacency, &mut visited, &mut stack) {
            let virtual_edges = cycle_edges(&nodes)
                .into_iter()
                .filter(|edge| virtual_set.contains(edge))
                .collect();
            return Some(CycleReport {
                nodes,
                virtual_edges,
            });
        }
    }

    None
}

fn visit(
    node: NodeId,
    adjacency: &BTreeMap<NodeId, BTreeSet<NodeId>>,
    visited: &mut HashMap<NodeId, Visit>,
    stack: &mut Vec<NodeId>,
) -> Option<Vec<NodeId>> {
    visited.insert(node, Visit::InStack);
    stack.push(node);

    if let Some(neighbors) = adjacency.get(&node) {
        for &next in neighbors {
            match visited.get(&next) {
                Some(Visit::InStack) => {
                    let start = stack.iter().position(|&n| n == next).unwrap_or(0);
                    return Some(stack[start..].to_vec());
                }
                Some(Visit::Done) => {}
                None => {
                    if let Some(cycle) = visit(next, adjacency, visited, stack) {
                        return Some(cycle);
                    }
                }
            }
        }
    }

    stack.pop();
    visited.insert(node, Visit::Done);
    None
}

/// Consecutive (from, to) pairs of the chain, including the closing edge
fn cycle_edges(nodes: &[NodeId]) -> Vec<(NodeId, NodeId)> {
    let mut edges = Vec::with_capacity(nodes.len());
    for pair in nodes.windows(2) {
        edges.push((pair[0], pair[1]));
    }
    if let (Some(&last), Some(&first)) = (nodes.last(), nodes.first()) {
        edges.push((last, first));
    }
    edges
}
