//! Broadcast resolution
//!
//! The central algorithm: for every unconnected input of every
//! non-broadcaster live node, find the best-matching broadcast rule and
//! synthesize a virtual link. Resolution over a fixed `(nodes, rules)` pair
//! is a pure function: identical output for identical input, and the
//! inputs are never mutated.

use crate::node::NodeId;
use crate::registry::BroadcastRule;
use crate::snapshot::{InputSlot, NodeDescriptor, NodeRole};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An implicit connection synthesized by the resolver. Never touches the
/// underlying graph; it exists only in the in-memory overlay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualLink {
    pub downstream_node: NodeId,
    pub downstream_input: String,
    pub upstream_node: NodeId,
    pub upstream_output: String,
    /// The node whose broadcast produced this link. Currently always the
    /// upstream node; kept distinct for future indirection.
    pub controller_node: NodeId,
}

/// Specificity tier of a candidate match, least specific first so the
/// derived ordering ranks more specific tiers higher
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchTier {
    TypeOnly,
    TitleAndType,
    NameAndType,
    ExplicitTarget,
}

/// Two or more candidates tied exactly for an input. Diagnostic only; the
/// first-found candidate wins and resolution proceeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchConflict {
    pub node: NodeId,
    pub input: String,
    /// The tied sources as (node id, output name) pairs, winner first
    pub sources: Vec<(NodeId, String)>,
}

/// Output of a resolution pass over one snapshot
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    /// Winning virtual link per (node id, input name)
    pub assignments: BTreeMap<(NodeId, String), VirtualLink>,
    pub conflicts: Vec<MatchConflict>,
}

impl Resolution {
    /// Virtual links in deterministic (node id, input name) order
    pub fn links(&self) -> impl Iterator<Item = &VirtualLink> {
        self.assignments.values()
    }
}

/// Resolves every unconnected input of every consumer/plain node against the
/// broadcast rules, keeping the best match per input.
///
/// Candidates rank by specificity tier, then by registration order within a
/// tier: the last-registered rule wins, so a broadcaster added later in the
/// graph supersedes an earlier one for the same input. Inputs with no
/// surviving candidate are left untouched.
pub fn resolve(nodes: &[NodeDescriptor], rules: &[BroadcastRule]) -> Resolution {
    let mut resolution = Resolution::default();

    for node in nodes {
        if node.role == NodeRole::Broadcaster {
            continue;
        }
        for input in &node.inputs {
            if input.connected {
                continue;
            }
            if let Some((winner, tier, tied)) = find_best_match(node, input, rules) {
                if !tied.is_empty() {
                    let mut sources = vec![(winner.source_node, winner.source_output.clone())];
                    sources.extend(tied);
                    log::debug!(
                        "node {} input {:?}: {} candidates tied at {:?}, keeping first",
                        node.id,
                        input.name,
                        sources.len(),
                        tier
                    );
                    resolution.conflicts.push(MatchConflict {
                        node: node.id,
                        input: input.name.clone(),
                        sources,
                    });
                }
                resolution.assignments.insert(
                    (node.id, input.name.clone()),
                    VirtualLink {
                        downstream_node: node.id,
                        downstream_input: input.name.clone(),
                        upstream_node: winner.source_node,
                        upstream_output: winner.source_output.clone(),
                        controller_node: winner.source_node,
                    },
                );
            }
        }
    }

    resolution
}

/// Best candidate for one input, with the tier it won at and any candidates
/// tied with it on both tier and registration order.
fn find_best_match<'r>(
    node: &NodeDescriptor,
    input: &InputSlot,
    rules: &'r [BroadcastRule],
) -> Option<(&'r BroadcastRule, MatchTier, Vec<(NodeId, String)>)> {
    let mut best: Option<(&BroadcastRule, MatchTier)> = None;
    let mut tied: Vec<(NodeId, String)> = Vec::new();

    for rule in rules {
        let Some(tier) = candidate_tier(rule, node, input) else {
            continue;
        };
        match best {
            None => best = Some((rule, tier)),
            Some((current, current_tier)) => {
                let challenger = (tier, rule.node_order);
                let incumbent = (current_tier, current.node_order);
                if challenger > incumbent {
                    best = Some((rule, tier));
                    tied.clear();
                } else if challenger == incumbent {
                    // exact tie: first-found wins, record for diagnostics
                    tied.push((rule.source_node, rule.source_output.clone()));
                }
            }
        }
    }

    best.map(|(rule, tier)| (rule, tier, tied))
}

/// Applies the candidate filter of one rule against one unconnected input.
/// Returns the specificity tier on a match, `None` on rejection.
fn candidate_tier(rule: &BroadcastRule, node: &NodeDescriptor, input: &InputSlot) -> Option<MatchTier> {
    // An explicit target set short-circuits everything else: membership is
    // the whole test, absence is an immediate rejection.
    if let Some(targets) = &rule.explicit_targets {
        return targets.contains(&node.id).then_some(MatchTier::ExplicitTarget);
    }

    if !rule.data_type.can_connect_to(&input.declared_type) {
        return None;
    }
    if let Some(pattern) = &rule.name_pattern {
        if !pattern.is_match(&input.name) {
            return None;
        }
    }
    if let Some(pattern) = &rule.title_pattern {
        if !pattern.is_match(&node.title) {
            return None;
        }
    }
    // Restriction is a property of the broadcaster's visibility: a
    // restricted rule needs a shared group with the consumer.
    if rule.restricted && rule.groups.is_disjoint(&node.groups) {
        return None;
    }

    if rule.name_pattern.is_some() {
        Some(MatchTier::NameAndType)
    } else if rule.title_pattern.is_some() {
        Some(MatchTier::TitleAndType)
    } else {
        Some(MatchTier::TypeOnly)
    }
}
