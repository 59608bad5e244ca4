//! Execution payload shaping
//!
//! The submission pipeline consumes a per-node map of input sources. The
//! raw payload reflects only real wiring; the controller augments a copy of
//! it with the accepted virtual links before anything is sent downstream.

use crate::cache::ResolutionResult;
use crate::node::NodeId;
use crate::snapshot::GraphSnapshot;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Source of one input slot in the execution payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PayloadInput {
    /// Wired in the host graph
    Connected {
        upstream_node: NodeId,
        upstream_output: String,
    },
    /// Filled in by broadcast resolution
    Broadcast {
        upstream_node: NodeId,
        upstream_output: String,
    },
    /// No source; the executing backend applies its own default
    Unconnected,
}

/// One live node's entry in the payload
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadNode {
    pub inputs: BTreeMap<String, PayloadInput>,
}

/// The data handed to the execution backend
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionPayload {
    pub nodes: BTreeMap<NodeId, PayloadNode>,
}

/// Builds the pre-resolution payload from a snapshot: every live node, with
/// wired inputs carrying their upstream reference and everything else
/// unconnected. This is the host snapshot producer's contract, kept in
/// crate form so the two-phase submission API has a concrete stand-in.
pub fn build_raw_payload(snapshot: &GraphSnapshot) -> ExecutionPayload {
    let mut payload = ExecutionPayload::default();

    for node in &snapshot.nodes {
        let mut entry = PayloadNode::default();
        for (port, input) in node.inputs.iter().enumerate() {
            let source = if input.connected {
                upstream_of(snapshot, node.id, port)
            } else {
                PayloadInput::Unconnected
            };
            entry.inputs.insert(input.name.clone(), source);
        }
        payload.nodes.insert(node.id, entry);
    }

    payload
}

/// Applies every accepted virtual link to a payload copy. Only unconnected
/// inputs are filled; real wiring is never overwritten.
pub fn apply_assignments(mut payload: ExecutionPayload, result: &ResolutionResult) -> ExecutionPayload {
    for link in result.virtual_links() {
        let Some(node) = payload.nodes.get_mut(&link.downstream_node) else {
            continue;
        };
        let Some(slot) = node.inputs.get_mut(&link.downstream_input) else {
            continue;
        };
        if *slot == PayloadInput::Unconnected {
            *slot = PayloadInput::Broadcast {
                upstream_node: link.upstream_node,
                upstream_output: link.upstream_output.clone(),
            };
        }
    }
    payload
}

/// Upstream (node, output name) of a wired input, resolved through the
/// snapshot's validated connections
fn upstream_of(snapshot: &GraphSnapshot, node: NodeId, port: usize) -> PayloadInput {
    let conn = snapshot
        .connections
        .iter()
        .find(|conn| conn.to_node == node && conn.to_port == port);
    match conn {
        Some(conn) => {
            let upstream_output = snapshot
                .descriptor(conn.from_node)
                .and_then(|desc| desc.outputs.get(conn.from_port))
                .map(|output| output.name.clone())
                .unwrap_or_default();
            PayloadInput::Connected {
                upstream_node: conn.from_node,
                upstream_output,
            }
        }
        // connected flag without a matching validated connection cannot
        // happen; fall back to unconnected rather than panic
        None => PayloadInput::Unconnected,
    }
}
