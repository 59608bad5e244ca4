//! Host-owned settings read by the engine

use serde::{Deserialize, Serialize};

/// Settings the host exposes to the user. The engine only ever reads these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BroadcastSettings {
    /// Run loop detection on the submission path. When disabled, virtual
    /// links are applied even if they close a cycle.
    pub check_loops: bool,
    /// Verbose render projection: source labels and match-conflict
    /// diagnostics.
    pub show_details: bool,
}

impl Default for BroadcastSettings {
    fn default() -> Self {
        Self {
            check_loops: true,
            show_details: false,
        }
    }
}
