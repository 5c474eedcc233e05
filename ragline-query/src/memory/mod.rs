//! Conversation memory.
//!
//! Three variants share the [`ChatMemory`] interface:
//!
//! - [`SimpleMemory`]: append-only, no eviction
//! - [`TokenBufferMemory`]: evicts the oldest whole messages to stay under a
//!   token limit, keeping the first system message
//! - [`SummaryMemory`]: condenses the oldest messages into a rolling summary
//!   produced by an LLM
//!
//! Mutations take `&mut self` and are all-or-nothing: a failed call leaves
//! the stored messages unchanged. Wrap a memory in [`SharedMemory`] when
//! several tasks need to use it.

use async_trait::async_trait;
use ragline_core::{CallContext, ChatMessage, Result, Tokenizer};

pub mod shared;
pub mod simple;
pub mod summary;
pub mod token_buffer;

pub use shared::*;
pub use simple::*;
pub use summary::*;
pub use token_buffer::*;

/// Shared interface of the memory variants.
#[async_trait]
pub trait ChatMemory: Send + Sync + std::fmt::Debug {
    /// Messages to send with the next LLM call.
    ///
    /// `input` is the pending user input; variants with a token budget
    /// reserve room for it.
    fn get(&self, input: Option<&str>) -> Result<Vec<ChatMessage>>;

    /// Every stored message, including any synthetic summary.
    fn get_all(&self) -> Vec<ChatMessage>;

    /// Append one message.
    async fn put(&mut self, message: ChatMessage, ctx: &CallContext) -> Result<()> {
        self.put_messages(vec![message], ctx).await
    }

    /// Append several messages as one mutation.
    async fn put_messages(&mut self, messages: Vec<ChatMessage>, ctx: &CallContext) -> Result<()>;

    /// Replace the stored messages.
    ///
    /// `set(get_all())` leaves the memory unchanged.
    async fn set(&mut self, messages: Vec<ChatMessage>, ctx: &CallContext) -> Result<()>;

    /// Drop every stored message.
    fn reset(&mut self);

    /// Number of stored messages.
    fn message_count(&self) -> usize {
        self.get_all().len()
    }

    /// Name of this memory variant for logging.
    fn name(&self) -> &'static str;
}

/// Closed set of memory variants with static dispatch.
#[derive(Debug)]
pub enum AnyMemory {
    /// Append-only memory.
    Simple(SimpleMemory),
    /// Token-bounded memory.
    TokenBuffer(TokenBufferMemory),
    /// Summarizing memory.
    Summary(SummaryMemory),
}

impl From<SimpleMemory> for AnyMemory {
    fn from(memory: SimpleMemory) -> Self {
        Self::Simple(memory)
    }
}

impl From<TokenBufferMemory> for AnyMemory {
    fn from(memory: TokenBufferMemory) -> Self {
        Self::TokenBuffer(memory)
    }
}

impl From<SummaryMemory> for AnyMemory {
    fn from(memory: SummaryMemory) -> Self {
        Self::Summary(memory)
    }
}

#[async_trait]
impl ChatMemory for AnyMemory {
    fn get(&self, input: Option<&str>) -> Result<Vec<ChatMessage>> {
        match self {
            Self::Simple(m) => m.get(input),
            Self::TokenBuffer(m) => m.get(input),
            Self::Summary(m) => m.get(input),
        }
    }

    fn get_all(&self) -> Vec<ChatMessage> {
        match self {
            Self::Simple(m) => m.get_all(),
            Self::TokenBuffer(m) => m.get_all(),
            Self::Summary(m) => m.get_all(),
        }
    }

    async fn put_messages(&mut self, messages: Vec<ChatMessage>, ctx: &CallContext) -> Result<()> {
        match self {
            Self::Simple(m) => m.put_messages(messages, ctx).await,
            Self::TokenBuffer(m) => m.put_messages(messages, ctx).await,
            Self::Summary(m) => m.put_messages(messages, ctx).await,
        }
    }

    async fn set(&mut self, messages: Vec<ChatMessage>, ctx: &CallContext) -> Result<()> {
        match self {
            Self::Simple(m) => m.set(messages, ctx).await,
            Self::TokenBuffer(m) => m.set(messages, ctx).await,
            Self::Summary(m) => m.set(messages, ctx).await,
        }
    }

    fn reset(&mut self) {
        match self {
            Self::Simple(m) => m.reset(),
            Self::TokenBuffer(m) => m.reset(),
            Self::Summary(m) => m.reset(),
        }
    }

    fn message_count(&self) -> usize {
        match self {
            Self::Simple(m) => m.message_count(),
            Self::TokenBuffer(m) => m.message_count(),
            Self::Summary(m) => m.message_count(),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Simple(m) => m.name(),
            Self::TokenBuffer(m) => m.name(),
            Self::Summary(m) => m.name(),
        }
    }
}

/// Token count of a message's transported text.
pub(crate) fn message_tokens(tokenizer: &dyn Tokenizer, message: &ChatMessage) -> usize {
    tokenizer.count_tokens(&message.transport_text())
}

/// Index of the first system message, which is exempt from eviction.
pub(crate) fn sticky_index(messages: &[ChatMessage]) -> Option<usize> {
    messages.iter().position(ChatMessage::is_system)
}
