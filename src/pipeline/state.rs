use serde::Serialize;
use std::fmt;

/// Lifecycle of one run
///
/// ```text
/// Idle → Listing → Planning ─┬─ (independent) ──────────────────────────────┬→ Dispatching → Aggregating → Completed
///                            └─ (sequential) → Estimating → AwaitingApproval ┴→ Cancelled
/// ```
///
/// `Failed` is reachable from `Listing` and `Planning`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Idle,
    Listing,
    Planning,
    Estimating,
    AwaitingApproval,
    Dispatching,
    Aggregating,
    Completed,
    Cancelled,
    Failed,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Idle => "idle",
            PipelineState::Listing => "listing",
            PipelineState::Planning => "planning",
            PipelineState::Estimating => "estimating",
            PipelineState::AwaitingApproval => "awaiting approval",
            PipelineState::Dispatching => "dispatching",
            PipelineState::Aggregating => "aggregating",
            PipelineState::Completed => "completed",
            PipelineState::Cancelled => "cancelled",
            PipelineState::Failed => "failed",
        };
        f.write_str(name)
    }
}
