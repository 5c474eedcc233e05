//! Append-only chat memory.

use async_trait::async_trait;
use ragline_core::{CallContext, ChatMessage, Result};
use tracing::debug;

use super::ChatMemory;

/// Stores every message it is given; `get` returns all of them.
#[derive(Debug, Clone, Default)]
pub struct SimpleMemory {
    messages: Vec<ChatMessage>,
}

impl SimpleMemory {
    /// Create an empty memory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a memory pre-populated with `messages`.
    pub fn from_messages(messages: Vec<ChatMessage>) -> Self {
        Self { messages }
    }
}

#[async_trait]
impl ChatMemory for SimpleMemory {
    fn get(&self, _input: Option<&str>) -> Result<Vec<ChatMessage>> {
        Ok(self.messages.clone())
    }

    fn get_all(&self) -> Vec<ChatMessage> {
        self.messages.clone()
    }

    async fn put_messages(&mut self, messages: Vec<ChatMessage>, ctx: &CallContext) -> Result<()> {
        ctx.check("memory put")?;
        debug!(count = messages.len(), "appending messages to simple memory");
        self.messages.extend(messages);
        Ok(())
    }

    async fn set(&mut self, messages: Vec<ChatMessage>, ctx: &CallContext) -> Result<()> {
        ctx.check("memory set")?;
        self.messages = messages;
        Ok(())
    }

    fn reset(&mut self) {
        self.messages.clear();
    }

    fn name(&self) -> &'static str {
        "SimpleMemory"
    }
}
