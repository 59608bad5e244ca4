//! Node types and core node functionality

use crate::port::{DataType, Port, PortType};
use serde::{Deserialize, Serialize};

/// Unique identifier for a node
pub type NodeId = usize;

/// Broadcast configuration carried by a broadcaster node.
///
/// A node owning one of these offers every declared output as an implicit
/// source to compatible unconnected inputs elsewhere in the graph. The
/// optional constraints narrow which inputs the node is willing to feed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BroadcastProperties {
    /// Restrict visibility to consumers sharing at least one group
    pub restricted: bool,
    /// Regex the target input's name must match, if set
    pub target_name_pattern: Option<String>,
    /// Regex the target node's title must match, if set
    pub target_title_pattern: Option<String>,
    /// When set, the broadcast applies only to these node ids, overriding
    /// pattern and type matching
    pub explicit_targets: Option<Vec<NodeId>>,
}

/// Core node structure representing a node in the host graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub title: String,
    /// Bypassed nodes are excluded from analysis entirely
    pub bypassed: bool,
    /// Group identifiers this node belongs to (for broadcast scoping)
    pub groups: Vec<String>,
    pub inputs: Vec<Port>,
    pub outputs: Vec<Port>,
    /// Present iff this node is a broadcaster
    pub broadcast: Option<BroadcastProperties>,
}

impl Node {
    /// Creates a new node with the specified properties
    pub fn new(id: NodeId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            bypassed: false,
            groups: vec![],
            inputs: vec![],
            outputs: vec![],
            broadcast: None,
        }
    }

    /// Adds an input port to the node
    pub fn add_input(&mut self, name: impl Into<String>, data_type: impl Into<DataType>) -> &mut Self {
        let port_id = self.inputs.len();
        self.inputs.push(Port::new(port_id, name, PortType::Input, data_type));
        self
    }

    /// Adds an output port to the node
    pub fn add_output(&mut self, name: impl Into<String>, data_type: impl Into<DataType>) -> &mut Self {
        let port_id = self.outputs.len();
        self.outputs.push(Port::new(port_id, name, PortType::Output, data_type));
        self
    }

    /// Marks the node as a broadcaster with default (unconstrained) properties
    pub fn with_broadcast(mut self, properties: BroadcastProperties) -> Self {
        self.broadcast = Some(properties);
        self
    }

    /// Adds the node to a group
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.groups.push(group.into());
        self
    }

    /// Sets the bypassed flag
    pub fn with_bypassed(mut self, bypassed: bool) -> Self {
        self.bypassed = bypassed;
        self
    }

    /// Check if this node is a broadcaster
    pub fn is_broadcaster(&self) -> bool {
        self.broadcast.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_ids_follow_declaration_order() {
        let mut node = Node::new(0, "Add");
        node.add_input("a", "number").add_input("b", "number");
        node.add_output("sum", "number");

        assert_eq!(node.inputs[0].id, 0);
        assert_eq!(node.inputs[1].id, 1);
        assert_eq!(node.inputs[1].name, "b");
        assert_eq!(node.outputs[0].id, 0);
    }

    #[test]
    fn test_broadcaster_flag() {
        let plain = Node::new(0, "Add");
        assert!(!plain.is_broadcaster());

        let caster = Node::new(1, "Anywhere").with_broadcast(BroadcastProperties::default());
        assert!(caster.is_broadcaster());
        assert!(!caster.broadcast.as_ref().unwrap().restricted);
    }
}
