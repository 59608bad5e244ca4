//! Error types surfaced by the resolution engine

use crate::loop_detect::CycleReport;
use thiserror::Error;

/// Fatal conditions for a submission attempt. Structural problems in the
/// snapshot and match conflicts are diagnostics, not errors; they never
/// appear here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BroadcastError {
    /// The augmented graph contains a cycle; nothing was applied to the
    /// submission payload.
    #[error("{0} - not submitting")]
    CycleDetected(CycleReport),

    /// A submission analysis is already in flight; retry when it completes.
    #[error("a submission analysis is already in flight")]
    SubmissionBusy,
}
