//! Bounded, cancellable streams backed by a channel.
//!
//! Providers push events into a [`StreamSender`]; consumers pull from the
//! returned [`LlmStream`]. The channel is bounded, so a slow consumer makes
//! `send` wait, and the producer sees a closed channel once the consumer
//! drops the stream or the context is cancelled.

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::{CallContext, LlmStream, Result};

/// Producer half of [`stream_channel`].
#[derive(Debug)]
pub struct StreamSender<T> {
    tx: mpsc::Sender<Result<T>>,
    ctx: CallContext,
}

impl<T> Clone for StreamSender<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            ctx: self.ctx.clone(),
        }
    }
}

impl<T: Send> StreamSender<T> {
    /// Push one item, waiting for capacity.
    ///
    /// Returns `false` when the consumer is gone or the context was
    /// cancelled; the producer should stop.
    pub async fn send(&self, item: Result<T>) -> bool {
        if self.is_closed() {
            return false;
        }
        tokio::select! {
            biased;
            () = self.ctx.token().cancelled() => false,
            sent = self.tx.send(item) => sent.is_ok(),
        }
    }

    /// Whether the consumer dropped the stream or the context was cancelled.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed() || self.ctx.is_cancelled()
    }
}

/// Create a bounded stream channel tied to `ctx`.
///
/// The consumer side stops yielding as soon as `ctx` is cancelled, even if
/// items are still buffered.
pub fn stream_channel<T: Send + 'static>(
    capacity: usize,
    ctx: &CallContext,
) -> (StreamSender<T>, LlmStream<T>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let stream = ctx.guard_stream(ReceiverStream::new(rx));
    (
        StreamSender {
            tx,
            ctx: ctx.clone(),
        },
        Box::pin(stream),
    )
}
