use std::future::Future;
use std::time::Duration;

use crate::types::{FrameError, Result};

/// Execute an async operation with a timeout
///
/// Returns [`FrameError::Timeout`] if the operation doesn't complete within
/// `timeout`. The operation is dropped when the timeout fires.
pub async fn with_timeout<T, F>(timeout: Duration, future: F, operation_name: &str) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => Err(FrameError::timeout(operation_name, timeout)),
    }
}
