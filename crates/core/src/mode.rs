//! Workflow run modes.

use serde::{Deserialize, Serialize};

/// How a workflow execution was started.
///
/// Nodes use this to route behavior that only makes sense while a user is
/// watching — e.g. forwarding guest diagnostics to the editor instead of
/// the process log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Started by a user from the editor.
    Manual,
    /// Started by a trigger node (schedule, poll, event source).
    Trigger,
    /// Started by an incoming webhook request.
    Webhook,
    /// Re-run of a previously failed execution.
    Retry,
}

impl RunMode {
    /// Returns `true` if a user is driving this execution live.
    #[must_use]
    pub fn is_interactive(self) -> bool {
        matches!(self, Self::Manual)
    }
}
