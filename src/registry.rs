//! Broadcast rule registry
//!
//! Scans the live nodes of a snapshot for broadcasters and builds the
//! ordered rule list the resolver matches against. Node traversal order is
//! preserved; it later serves as the deterministic "last registered wins"
//! tie-break.

use crate::node::NodeId;
use crate::port::DataType;
use crate::snapshot::{NodeDescriptor, NodeRole};
use regex::Regex;
use std::collections::HashSet;

/// One broadcast offer, derived from a broadcaster node's output slot
#[derive(Debug, Clone)]
pub struct BroadcastRule {
    pub source_node: NodeId,
    pub source_output: String,
    /// Inherited from the output's declared type
    pub data_type: DataType,
    /// Compiled constraint on the target input's name, if any
    pub name_pattern: Option<Regex>,
    /// Compiled constraint on the target node's title, if any
    pub title_pattern: Option<Regex>,
    /// When set, the rule applies only to these node ids
    pub explicit_targets: Option<HashSet<NodeId>>,
    pub restricted: bool,
    /// Groups of the owning node, consulted when `restricted`
    pub groups: HashSet<String>,
    /// Position of the owning node in snapshot traversal. Rules from the
    /// same node share this; a later node's rules override an earlier
    /// node's within the same specificity tier.
    pub node_order: usize,
}

/// Builds the ordered broadcast rule list from the live node sequence.
///
/// Each broadcaster contributes one rule per declared output; a broadcaster
/// with no outputs contributes none. A pattern that fails to compile is
/// dropped and the rule stays unconstrained: malformed restriction data
/// defaults to "unrestricted".
pub fn build_broadcast_rules(nodes: &[NodeDescriptor]) -> Vec<BroadcastRule> {
    let mut rules = Vec::new();

    for (node_order, node) in nodes.iter().enumerate() {
        if node.role != NodeRole::Broadcaster {
            continue;
        }
        let Some(properties) = &node.broadcast else {
            continue;
        };

        let name_pattern = compile_pattern(node.id, "name", properties.target_name_pattern.as_deref());
        let title_pattern =
            compile_pattern(node.id, "title", properties.target_title_pattern.as_deref());
        let explicit_targets = properties
            .explicit_targets
            .as_ref()
            .map(|targets| targets.iter().copied().collect::<HashSet<NodeId>>());

        for output in &node.outputs {
            rules.push(BroadcastRule {
                source_node: node.id,
                source_output: output.name.clone(),
                data_type: output.declared_type.clone(),
                name_pattern: name_pattern.clone(),
                title_pattern: title_pattern.clone(),
                explicit_targets: explicit_targets.clone(),
                restricted: properties.restricted,
                groups: node.groups.clone(),
                node_order,
            });
        }
    }

    rules
}

fn compile_pattern(node: NodeId, which: &str, pattern: Option<&str>) -> Option<Regex> {
    let pattern = pattern?;
    match Regex::new(pattern) {
        Ok(regex) => Some(regex),
        Err(err) => {
            log::warn!(
                "node {}: invalid {} pattern {:?}, constraint dropped: {}",
                node,
                which,
                pattern,
                err
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeGraph;
    use crate::node::{BroadcastProperties, Node};
    use crate::snapshot::read_snapshot;

    fn caster(title: &str, properties: BroadcastProperties, outputs: &[(&str, &str)]) -> Node {
        let mut node = Node::new(0, title).with_broadcast(properties);
        for (name, data_type) in outputs {
            node.add_output(*name, *data_type);
        }
        node
    }

    #[test]
    fn test_one_rule_per_output_in_traversal_order() {
        let mut graph = NodeGraph::new();
        graph.add_node(caster(
            "A",
            BroadcastProperties::default(),
            &[("x", "number"), ("y", "image")],
        ));
        graph.add_node(caster("B", BroadcastProperties::default(), &[("z", "number")]));

        let snapshot = read_snapshot(&graph);
        let rules = build_broadcast_rules(&snapshot.nodes);

        assert_eq!(rules.len(), 3);
        assert_eq!(rules[0].source_output, "x");
        assert_eq!(rules[1].source_output, "y");
        assert_eq!(rules[2].source_node, 1);
        // both of A's rules share A's traversal position
        assert_eq!(rules[0].node_order, rules[1].node_order);
        assert!(rules[2].node_order > rules[1].node_order);
    }

    #[test]
    fn test_broadcaster_without_outputs_contributes_nothing() {
        let mut graph = NodeGraph::new();
        graph.add_node(caster("Empty", BroadcastProperties::default(), &[]));

        let snapshot = read_snapshot(&graph);
        assert!(build_broadcast_rules(&snapshot.nodes).is_empty());
    }

    #[test]
    fn test_malformed_pattern_degrades_to_unconstrained() {
        let mut graph = NodeGraph::new();
        graph.add_node(caster(
            "Bad",
            BroadcastProperties {
                target_name_pattern: Some("([unclosed".to_string()),
                ..Default::default()
            },
            &[("value", "number")],
        ));

        let snapshot = read_snapshot(&graph);
        let rules = build_broadcast_rules(&snapshot.nodes);
        assert_eq!(rules.len(), 1);
        assert!(rules[0].name_pattern.is_none());
    }

    #[test]
    fn test_rule_inherits_owner_scope() {
        let mut graph = NodeGraph::new();
        graph.add_node(
            caster(
                "Scoped",
                BroadcastProperties {
                    restricted: true,
                    ..Default::default()
                },
                &[("value", "number")],
            )
            .with_group("g1"),
        );

        let snapshot = read_snapshot(&graph);
        let rules = build_broadcast_rules(&snapshot.nodes);
        assert!(rules[0].restricted);
        assert!(rules[0].groups.contains("g1"));
    }
}
