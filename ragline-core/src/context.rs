//! Cancellation-carrying call context.
//!
//! Every public async operation in ragline takes a [`CallContext`]. The
//! context carries a cooperative cancellation token and an optional
//! deadline; suspension points (LLM calls, embedding calls, stream reads)
//! race their work against both.

use std::future::Future;
use std::time::Duration;

use futures::{Stream, StreamExt};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::{RaglineError, Result};

/// Per-call context threaded through every operation.
///
/// Cloning a context shares the same cancellation token; use
/// [`CallContext::child`] to derive a context that can be cancelled
/// independently of its parent.
///
/// # Examples
///
/// ```rust
/// use ragline_core::CallContext;
/// use std::time::Duration;
///
/// let ctx = CallContext::new().with_timeout(Duration::from_secs(30));
/// let child = ctx.child();
/// ctx.cancel();
/// assert!(child.is_cancelled());
/// ```
#[derive(Debug, Clone)]
pub struct CallContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Default for CallContext {
    fn default() -> Self {
        Self::new()
    }
}

impl CallContext {
    /// Create a live context with no deadline.
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: None,
        }
    }

    /// Create a context driven by an existing cancellation token.
    pub fn with_token(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// Set a deadline relative to now. An earlier existing deadline wins.
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Set an absolute deadline. An earlier existing deadline wins.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) if existing < deadline => existing,
            _ => deadline,
        });
        self
    }

    /// Derive a child context. Cancelling the parent cancels the child,
    /// but not the other way around.
    #[must_use]
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    /// Cancel this context and all of its children.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// The underlying cancellation token.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// The deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Fail fast if the context is already cancelled or past its deadline.
    pub fn check(&self, operation: &str) -> Result<()> {
        if self.token.is_cancelled() {
            return Err(RaglineError::Cancelled);
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(RaglineError::timeout(operation));
            }
        }
        Ok(())
    }

    /// Run a future to completion unless the context is cancelled or its
    /// deadline elapses first.
    pub async fn run<F, T>(&self, operation: &str, future: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.check(operation)?;

        tokio::select! {
            biased;
            () = self.token.cancelled() => Err(RaglineError::Cancelled),
            () = sleep_until(self.deadline) => Err(RaglineError::timeout(operation)),
            result = future => result,
        }
    }

    /// A `'static` future that resolves once the context is cancelled or
    /// its deadline passes.
    pub fn done(&self) -> impl Future<Output = ()> + Send + 'static {
        let token = self.token.clone();
        let deadline = self.deadline;
        async move {
            tokio::select! {
                () = token.cancelled() => {}
                () = sleep_until(deadline) => {}
            }
        }
    }

    /// Wrap a stream so that it ends as soon as the context is done.
    ///
    /// No item is yielded after cancellation is observed.
    pub fn guard_stream<S>(&self, stream: S) -> impl Stream<Item = S::Item> + Send + 'static
    where
        S: Stream + Send + 'static,
    {
        stream.take_until(self.done())
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}
