//! Caller-side retry policy.

use std::future::Future;

use tracing::warn;

use crate::{CallContext, Result};

/// Run `op` under `ctx`, retrying exactly once when the first attempt fails
/// with a retryable (transport) error and the context is still live.
///
/// Cancellation, deadline expiry, and every non-transport error surface
/// immediately. The second failure surfaces as-is.
pub async fn retry_once<T, F, Fut>(ctx: &CallContext, operation: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    match ctx.run(operation, op()).await {
        Err(err) if err.is_retryable() && ctx.check(operation).is_ok() => {
            warn!(operation, error = %err, "retrying once after transport error");
            ctx.run(operation, op()).await
        }
        other => other,
    }
}
