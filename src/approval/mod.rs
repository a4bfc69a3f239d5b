//! Approval Gate
//!
//! A human checkpoint between planning and costly dispatch. The gate sees the
//! full plan and every window's membership and answers accept or reject.
//!
//! Gates never fail: anything other than an explicit accept is a decline.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::types::{RunPlan, Window};

/// One window as presented for approval
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WindowSummary {
    pub index: usize,
    pub start: usize,
    pub members: Vec<String>,
}

impl From<&Window> for WindowSummary {
    fn from(window: &Window) -> Self {
        Self {
            index: window.index,
            start: window.start,
            members: window.names(),
        }
    }
}

/// Everything a human needs to accept or reject a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApprovalRequest {
    pub plan: RunPlan,
    pub windows: Vec<WindowSummary>,
}

impl ApprovalRequest {
    pub fn new(plan: RunPlan, windows: &[Window]) -> Self {
        Self {
            plan,
            windows: windows.iter().map(WindowSummary::from).collect(),
        }
    }
}

#[async_trait]
pub trait ApprovalGate: Send + Sync {
    /// Present the plan and wait for a decision
    async fn confirm(&self, request: ApprovalRequest) -> bool;
}

pub type SharedGate = Arc<dyn ApprovalGate>;

/// Accepts every plan (non-interactive runs)
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoApprove;

#[async_trait]
impl ApprovalGate for AutoApprove {
    async fn confirm(&self, request: ApprovalRequest) -> bool {
        debug!(windows = request.windows.len(), "Plan auto-approved");
        true
    }
}

/// Rejects every plan
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoDecline;

#[async_trait]
impl ApprovalGate for AutoDecline {
    async fn confirm(&self, request: ApprovalRequest) -> bool {
        debug!(windows = request.windows.len(), "Plan auto-declined");
        false
    }
}

/// A pending decision handed to an approval surface
pub struct ApprovalPrompt {
    pub request: ApprovalRequest,
    reply: oneshot::Sender<bool>,
}

impl ApprovalPrompt {
    pub fn accept(self) {
        self.respond(true);
    }

    pub fn decline(self) {
        self.respond(false);
    }

    pub fn respond(self, approved: bool) {
        if self.reply.send(approved).is_err() {
            warn!("Run dropped before receiving approval decision");
        }
    }
}

/// Hands each request to a separate approval surface over a channel.
///
/// The surface answers through the one-shot reply carried by
/// [`ApprovalPrompt`]. A closed channel or a dropped prompt is a decline.
#[derive(Clone)]
pub struct ChannelApprovalGate {
    sender: mpsc::Sender<ApprovalPrompt>,
}

impl ChannelApprovalGate {
    /// Create a gate and the receiving end for the approval surface
    pub fn new() -> (Self, mpsc::Receiver<ApprovalPrompt>) {
        let (sender, receiver) = mpsc::channel(1);
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl ApprovalGate for ChannelApprovalGate {
    async fn confirm(&self, request: ApprovalRequest) -> bool {
        let (reply, decision) = oneshot::channel();
        if self
            .sender
            .send(ApprovalPrompt { request, reply })
            .await
            .is_err()
        {
            warn!("Approval surface unavailable, treating as declined");
            return false;
        }

        match decision.await {
            Ok(approved) => approved,
            Err(_) => {
                warn!("Approval surface dropped the request, treating as declined");
                false
            }
        }
    }
}
