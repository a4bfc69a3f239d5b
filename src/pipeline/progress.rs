//! Run Progress Reporting
//!
//! The controller reports state changes and per-unit completion through a
//! [`ProgressReporter`], which keeps a snapshot and relays every update as a
//! [`ProgressEvent`] on an unbounded channel in planning order.

use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::time::Instant;
use tokio::sync::mpsc;

use super::state::PipelineState;
use crate::types::{DescriptionRecord, RunPlan, RunStatus};

/// Progress event types
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    StateChanged {
        state: PipelineState,
    },
    /// Plan fixed, before approval or dispatch
    PlanReady {
        plan: RunPlan,
    },
    UnitStarted {
        ordinal: usize,
        total: usize,
        label: String,
    },
    UnitFinished {
        completed: usize,
        total: usize,
        subject: PathBuf,
        failed: bool,
        /// Seconds left at the current throughput, `None` once done
        eta_secs: Option<u64>,
    },
    /// Run finished; `status` is `None` when the run failed
    Finished {
        status: Option<RunStatus>,
        succeeded: usize,
        failed: usize,
        elapsed_secs: u64,
    },
}

/// Snapshot of a run's progress
#[derive(Debug, Clone)]
pub struct ProgressState {
    pub state: PipelineState,
    pub completed: usize,
    pub total: usize,
    pub failed: usize,
}

impl Default for ProgressState {
    fn default() -> Self {
        Self {
            state: PipelineState::Idle,
            completed: 0,
            total: 0,
            failed: 0,
        }
    }
}

impl ProgressState {
    pub fn percent(&self) -> f32 {
        percent(self.completed, self.total)
    }
}

/// Completion percentage in `[0, 100]`; 0 when there is nothing to do
pub fn percent(completed: usize, total: usize) -> f32 {
    if total == 0 {
        return 0.0;
    }
    (completed as f32 / total as f32 * 100.0).min(100.0)
}

#[derive(Clone)]
pub struct ProgressReporter {
    state: Arc<RwLock<ProgressState>>,
    sender: mpsc::UnboundedSender<ProgressEvent>,
    start_time: Instant,
}

impl ProgressReporter {
    /// Create a reporter and the receiving end of its event stream
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let reporter = Self {
            state: Arc::new(RwLock::new(ProgressState::default())),
            sender,
            start_time: Instant::now(),
        };
        (reporter, receiver)
    }

    /// Send an event. Discarded if the caller stopped listening.
    #[inline]
    fn emit(&self, event: ProgressEvent) {
        let _ = self.sender.send(event);
    }

    pub fn state(&self) -> ProgressState {
        self.state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn transition(&self, next: PipelineState) {
        self.state
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .state = next;
        tracing::debug!(state = %next, "Pipeline state changed");
        self.emit(ProgressEvent::StateChanged { state: next });
    }

    pub fn plan_ready(&self, plan: &RunPlan) {
        {
            let mut state = self
                .state
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            state.total = plan.unit_count;
            state.completed = 0;
            state.failed = 0;
        }
        self.emit(ProgressEvent::PlanReady { plan: plan.clone() });
    }

    pub fn unit_started(&self, ordinal: usize, label: &str) {
        let total = self.state().total;
        self.emit(ProgressEvent::UnitStarted {
            ordinal,
            total,
            label: label.to_string(),
        });
    }

    pub fn unit_finished(&self, record: &DescriptionRecord) {
        let elapsed = self.start_time.elapsed().as_secs_f32().max(0.1);

        let (completed, total) = {
            let mut state = self
                .state
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            state.completed += 1;
            if record.is_failed() {
                state.failed += 1;
            }
            (state.completed, state.total)
        };

        let throughput = completed as f32 / elapsed;
        let remaining = total.saturating_sub(completed);
        let eta_secs = (remaining > 0).then(|| (remaining as f32 / throughput) as u64);

        self.emit(ProgressEvent::UnitFinished {
            completed,
            total,
            subject: record.subject.clone(),
            failed: record.is_failed(),
            eta_secs,
        });
    }

    pub fn finish(&self, status: Option<RunStatus>) {
        let state = self.state();
        self.emit(ProgressEvent::Finished {
            status,
            succeeded: state.completed - state.failed,
            failed: state.failed,
            elapsed_secs: self.start_time.elapsed().as_secs(),
        });
    }
}
