//! Multi-owner access to a memory.

use std::sync::Arc;

use ragline_core::{CallContext, ChatMessage, Result};
use tokio::sync::Mutex;

use super::ChatMemory;

/// A cloneable handle that serializes access to one memory.
///
/// Every operation holds the lock for its whole duration, so concurrent
/// callers observe linearizable mutations and consistent snapshots.
#[derive(Debug)]
pub struct SharedMemory<M> {
    inner: Arc<Mutex<M>>,
}

impl<M> Clone for SharedMemory<M> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<M: ChatMemory> SharedMemory<M> {
    /// Wrap a memory.
    pub fn new(memory: M) -> Self {
        Self {
            inner: Arc::new(Mutex::new(memory)),
        }
    }

    /// See [`ChatMemory::get`].
    pub async fn get(&self, input: Option<&str>) -> Result<Vec<ChatMessage>> {
        self.inner.lock().await.get(input)
    }

    /// See [`ChatMemory::get_all`].
    pub async fn get_all(&self) -> Vec<ChatMessage> {
        self.inner.lock().await.get_all()
    }

    /// See [`ChatMemory::put`].
    pub async fn put(&self, message: ChatMessage, ctx: &CallContext) -> Result<()> {
        self.inner.lock().await.put(message, ctx).await
    }

    /// See [`ChatMemory::put_messages`].
    pub async fn put_messages(&self, messages: Vec<ChatMessage>, ctx: &CallContext) -> Result<()> {
        self.inner.lock().await.put_messages(messages, ctx).await
    }

    /// See [`ChatMemory::set`].
    pub async fn set(&self, messages: Vec<ChatMessage>, ctx: &CallContext) -> Result<()> {
        self.inner.lock().await.set(messages, ctx).await
    }

    /// See [`ChatMemory::reset`].
    pub async fn reset(&self) {
        self.inner.lock().await.reset();
    }

    /// See [`ChatMemory::message_count`].
    pub async fn message_count(&self) -> usize {
        self.inner.lock().await.message_count()
    }
}
