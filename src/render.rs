//! Render projection
//!
//! Maps an accepted resolution result into the minimal data a renderer
//! needs: per node, the ordered list of incoming virtual links. Pure and
//! stateless; the controller calls this once per render query.

use crate::cache::ResolutionResult;
use crate::node::NodeId;
use crate::resolver::{MatchConflict, VirtualLink};
use serde::Serialize;
use std::collections::BTreeMap;

/// One virtual link to draw into a node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderLink {
    pub link: VirtualLink,
    /// Human-readable source, present only in detail mode
    pub source_label: Option<String>,
}

/// Everything the renderer needs for one frame
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RenderOverlay {
    /// Incoming virtual links per node, ordered by input name
    pub incoming: BTreeMap<NodeId, Vec<RenderLink>>,
    /// Match-conflict diagnostics, populated only in detail mode
    pub conflicts: Vec<MatchConflict>,
}

impl RenderOverlay {
    /// Links terminating at the given node
    pub fn links_for(&self, node: NodeId) -> &[RenderLink] {
        self.incoming.get(&node).map_or(&[], Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.incoming.is_empty()
    }
}

/// Projects a resolution result for drawing. `None` (nothing accepted yet)
/// projects to an empty overlay rather than an error.
pub fn project(result: Option<&ResolutionResult>, show_details: bool) -> RenderOverlay {
    let mut overlay = RenderOverlay::default();
    let Some(result) = result else {
        return overlay;
    };

    for link in result.virtual_links() {
        let source_label =
            show_details.then(|| format!("{}.{}", link.upstream_node, link.upstream_output));
        overlay
            .incoming
            .entry(link.downstream_node)
            .or_default()
            .push(RenderLink {
                link: link.clone(),
                source_label,
            });
    }
    if show_details {
        overlay.conflicts = result.conflicts.clone();
    }

    overlay
}
