//! In-memory oracle for tests: replays scripted replies and records calls.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::{CaptionOracle, CaptionRequest};
use crate::types::{ErrorCategory, FrameError, Result};

pub(crate) enum Reply {
    Text(String),
    Fail(ErrorCategory),
    Slow(Duration, String),
}

pub(crate) struct ScriptedOracle {
    replies: Mutex<VecDeque<Reply>>,
    calls: AtomicUsize,
    requests: Mutex<Vec<CaptionRequest>>,
}

impl ScriptedOracle {
    pub(crate) fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Oracle that answers every call with "caption N"
    pub(crate) fn numbered() -> Self {
        Self::new(Vec::new())
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn requests(&self) -> Vec<CaptionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CaptionOracle for ScriptedOracle {
    async fn caption(&self, request: &CaptionRequest) -> Result<String> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());

        let reply = self.replies.lock().unwrap().pop_front();
        match reply {
            None => Ok(format!("caption {}", n)),
            Some(Reply::Text(text)) => Ok(text),
            Some(Reply::Fail(category)) => Err(FrameError::oracle(category, "scripted failure")),
            Some(Reply::Slow(delay, text)) => {
                tokio::time::sleep(delay).await;
                Ok(text)
            }
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-model"
    }

    fn max_tokens(&self) -> u32 {
        100
    }
}
