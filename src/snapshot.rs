//! Graph snapshot extraction
//!
//! Projects the host graph into a plain, analysis-friendly description:
//! live nodes with their input/output slots and the validated connections
//! between them. This is the only place the engine touches host graph state;
//! everything downstream works on the snapshot alone.

use crate::graph::{Connection, NodeGraph};
use crate::node::{BroadcastProperties, NodeId};
use crate::port::DataType;
use std::collections::HashSet;

/// Role a node plays in resolution, fixed when the snapshot is built
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
    /// Offers its outputs as implicit sources
    Broadcaster,
    /// Ordinary node with inputs that may receive implicit links
    Consumer,
    /// Ordinary node without inputs
    Plain,
}

/// An input slot on a live node
#[derive(Debug, Clone, PartialEq)]
pub struct InputSlot {
    pub name: String,
    pub declared_type: DataType,
    /// Already wired inputs are excluded from resolution
    pub connected: bool,
    /// Index of the wiring connection in the host graph, if connected
    pub current_link_id: Option<usize>,
}

/// An output slot on a live node
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSlot {
    pub name: String,
    pub declared_type: DataType,
}

/// Analysis-friendly description of one live node
#[derive(Debug, Clone)]
pub struct NodeDescriptor {
    pub id: NodeId,
    pub role: NodeRole,
    pub title: String,
    pub groups: HashSet<String>,
    /// Broadcasts from this node are visible only to consumers sharing a group
    pub restricted: bool,
    pub inputs: Vec<InputSlot>,
    pub outputs: Vec<OutputSlot>,
    /// Broadcast configuration, present iff `role == Broadcaster`
    pub broadcast: Option<BroadcastProperties>,
}

/// A malformed reference found while reading the graph. Recovered locally;
/// the offending connection is skipped and analysis proceeds.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuralWarning {
    /// Index of the connection in the host graph's connection list
    pub link_index: usize,
    pub detail: String,
}

/// Snapshot of the live graph, rebuilt from scratch on every resolution pass
#[derive(Debug, Clone, Default)]
pub struct GraphSnapshot {
    /// Live nodes in ascending id order (creation order)
    pub nodes: Vec<NodeDescriptor>,
    /// Validated connections between live nodes
    pub connections: Vec<Connection>,
    pub warnings: Vec<StructuralWarning>,
}

impl GraphSnapshot {
    /// Look up a descriptor by node id
    pub fn descriptor(&self, id: NodeId) -> Option<&NodeDescriptor> {
        self.nodes.iter().find(|n| n.id == id)
    }
}

/// Extracts a [`GraphSnapshot`] from the host graph.
///
/// Bypassed nodes are filtered out entirely: they contribute neither
/// broadcasts nor unresolved inputs, and their connections are treated as if
/// the node did not exist. A connection referencing a missing node or an
/// out-of-range port is skipped and recorded as a [`StructuralWarning`].
pub fn read_snapshot(graph: &NodeGraph) -> GraphSnapshot {
    let mut snapshot = GraphSnapshot::default();

    let live_ids: Vec<NodeId> = {
        let mut ids: Vec<NodeId> = graph
            .nodes
            .values()
            .filter(|node| !node.bypassed)
            .map(|node| node.id)
            .collect();
        ids.sort_unstable();
        ids
    };
    let live: HashSet<NodeId> = live_ids.iter().copied().collect();

    // Validate connections first so slot connected-state can be derived
    let mut valid_indices: Vec<usize> = Vec::new();
    for (index, conn) in graph.connections.iter().enumerate() {
        match validate_connection(graph, &live, conn) {
            Ok(true) => {
                valid_indices.push(index);
                snapshot.connections.push(conn.clone());
            }
            Ok(false) => {} // touches a bypassed node, drop silently
            Err(detail) => {
                log::warn!("skipping connection {}: {}", index, detail);
                snapshot.warnings.push(StructuralWarning {
                    link_index: index,
                    detail,
                });
            }
        }
    }

    for id in live_ids {
        let node = &graph.nodes[&id];

        let inputs = node
            .inputs
            .iter()
            .map(|port| {
                let link = valid_indices.iter().copied().find(|&index| {
                    let conn = &graph.connections[index];
                    conn.to_node == id && conn.to_port == port.id
                });
                InputSlot {
                    name: port.name.clone(),
                    declared_type: port.data_type.clone(),
                    connected: link.is_some(),
                    current_link_id: link,
                }
            })
            .collect();

        let outputs = node
            .outputs
            .iter()
            .map(|port| OutputSlot {
                name: port.name.clone(),
                declared_type: port.data_type.clone(),
            })
            .collect();

        let role = if node.broadcast.is_some() {
            NodeRole::Broadcaster
        } else if node.inputs.is_empty() {
            NodeRole::Plain
        } else {
            NodeRole::Consumer
        };

        snapshot.nodes.push(NodeDescriptor {
            id,
            role,
            title: node.title.clone(),
            groups: node.groups.iter().cloned().collect(),
            restricted: node.broadcast.as_ref().map_or(false, |b| b.restricted),
            inputs,
            outputs,
            broadcast: node.broadcast.clone(),
        });
    }

    snapshot
}

/// Ok(true): valid link between live nodes. Ok(false): endpoint bypassed.
/// Err: structurally inconsistent reference.
fn validate_connection(
    graph: &NodeGraph,
    live: &HashSet<NodeId>,
    conn: &Connection,
) -> Result<bool, String> {
    let from = graph
        .nodes
        .get(&conn.from_node)
        .ok_or_else(|| format!("source node {} does not exist", conn.from_node))?;
    let to = graph
        .nodes
        .get(&conn.to_node)
        .ok_or_else(|| format!("target node {} does not exist", conn.to_node))?;

    if conn.from_port >= from.outputs.len() {
        return Err(format!(
            "source port {} out of range for node {}",
            conn.from_port, conn.from_node
        ));
    }
    if conn.to_port >= to.inputs.len() {
        return Err(format!(
            "target port {} out of range for node {}",
            conn.to_port, conn.to_node
        ));
    }

    Ok(live.contains(&conn.from_node) && live.contains(&conn.to_node))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Node;

    fn two_node_graph() -> NodeGraph {
        let mut graph = NodeGraph::new();
        let mut source = Node::new(0, "Source");
        source.add_output("value", "number");
        let mut sink = Node::new(0, "Sink");
        sink.add_input("value", "number");
        graph.add_node(source);
        graph.add_node(sink);
        graph
    }

    #[test]
    fn test_snapshot_orders_nodes_by_id() {
        let mut graph = NodeGraph::new();
        graph.add_node_with_id(7, Node::new(0, "Late"));
        graph.add_node_with_id(2, Node::new(0, "Early"));

        let snapshot = read_snapshot(&graph);
        let ids: Vec<NodeId> = snapshot.nodes.iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![2, 7]);
    }

    #[test]
    fn test_bypassed_nodes_are_filtered_with_their_connections() {
        let mut graph = two_node_graph();
        graph.add_connection_by_ids(0, 0, 1, 0).unwrap();
        graph.nodes.get_mut(&0).unwrap().bypassed = true;

        let snapshot = read_snapshot(&graph);
        assert_eq!(snapshot.nodes.len(), 1);
        assert_eq!(snapshot.nodes[0].id, 1);
        assert!(snapshot.connections.is_empty());
        // bypass is not a structural problem
        assert!(snapshot.warnings.is_empty());
        // the sink's input reads as unconnected once its source is bypassed
        assert!(!snapshot.nodes[0].inputs[0].connected);
    }

    #[test]
    fn test_connected_inputs_carry_link_id() {
        let mut graph = two_node_graph();
        graph.add_connection_by_ids(0, 0, 1, 0).unwrap();

        let snapshot = read_snapshot(&graph);
        let sink = snapshot.descriptor(1).unwrap();
        assert!(sink.inputs[0].connected);
        assert_eq!(sink.inputs[0].current_link_id, Some(0));
    }

    #[test]
    fn test_dangling_port_reference_is_skipped_with_warning() {
        let mut graph = two_node_graph();
        // port index 3 does not exist on the sink
        graph.connections.push(Connection::new(0, 0, 1, 3));

        let snapshot = read_snapshot(&graph);
        assert!(snapshot.connections.is_empty());
        assert_eq!(snapshot.warnings.len(), 1);
        assert_eq!(snapshot.warnings[0].link_index, 0);
        // the rest of the graph still analyses
        assert_eq!(snapshot.nodes.len(), 2);
    }

    #[test]
    fn test_missing_node_reference_is_skipped_with_warning() {
        let mut graph = two_node_graph();
        graph.connections.push(Connection::new(42, 0, 1, 0));

        let snapshot = read_snapshot(&graph);
        assert_eq!(snapshot.warnings.len(), 1);
        assert!(snapshot.warnings[0].detail.contains("42"));
    }

    #[test]
    fn test_roles_are_fixed_at_snapshot_time() {
        let mut graph = NodeGraph::new();
        let mut caster = Node::new(0, "Anywhere").with_broadcast(BroadcastProperties::default());
        caster.add_output("value", "number");
        let mut consumer = Node::new(0, "Sink");
        consumer.add_input("value", "number");
        let plain = Node::new(0, "Const");

        graph.add_node(caster);
        graph.add_node(consumer);
        graph.add_node(plain);

        let snapshot = read_snapshot(&graph);
        assert_eq!(snapshot.nodes[0].role, NodeRole::Broadcaster);
        assert_eq!(snapshot.nodes[1].role, NodeRole::Consumer);
        assert_eq!(snapshot.nodes[2].role, NodeRole::Plain);
    }
}
