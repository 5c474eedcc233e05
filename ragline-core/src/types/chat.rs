//! Chat messages and content blocks.
//!
//! A [`ChatMessage`] carries exactly one role and either plain content or a
//! list of [`ContentBlock`]s. When blocks are present they supersede the
//! plain content for transport.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Role of a chat message author.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MessageRole {
    /// System instructions.
    System,
    /// End user.
    User,
    /// Model output.
    Assistant,
    /// Tool execution results.
    Tool,
}

/// Structured content carried by a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Plain text.
    Text {
        /// The text.
        text: String,
    },
    /// A tool invocation requested by the model.
    ToolCall {
        /// Tool name.
        name: String,
        /// Arguments as a JSON string.
        arguments: String,
        /// Call id echoed back in the matching result.
        id: String,
    },
    /// The output of a tool invocation, resubmitted by the caller.
    ToolResult {
        /// Id of the call this result answers.
        id: String,
        /// Tool output.
        output: String,
    },
}

impl ContentBlock {
    /// Textual payload of the block, used for token accounting.
    pub fn payload(&self) -> &str {
        match self {
            Self::Text { text } => text,
            Self::ToolCall { arguments, .. } => arguments,
            Self::ToolResult { output, .. } => output,
        }
    }
}

/// A single chat message.
///
/// # Examples
///
/// ```rust
/// use ragline_core::{ChatMessage, MessageRole};
///
/// let msg = ChatMessage::user("How do I reorder long contexts?");
/// assert_eq!(msg.role, MessageRole::User);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Author role.
    pub role: MessageRole,

    /// Plain text content.
    #[serde(default)]
    pub content: String,

    /// Structured content; supersedes `content` when non-empty.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blocks: Vec<ContentBlock>,

    /// Free-form annotations. Not sent to providers.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl ChatMessage {
    /// Create a message with plain content.
    pub fn new<S: Into<String>>(role: MessageRole, content: S) -> Self {
        Self {
            role,
            content: content.into(),
            blocks: Vec::new(),
            metadata: HashMap::new(),
        }
    }

    /// Create a system message.
    pub fn system<S: Into<String>>(content: S) -> Self {
        Self::new(MessageRole::System, content)
    }

    /// Create a user message.
    pub fn user<S: Into<String>>(content: S) -> Self {
        Self::new(MessageRole::User, content)
    }

    /// Create an assistant message.
    pub fn assistant<S: Into<String>>(content: S) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    /// Create a tool message carrying the result of call `id`.
    pub fn tool_result<I: Into<String>, S: Into<String>>(id: I, output: S) -> Self {
        let output = output.into();
        Self {
            role: MessageRole::Tool,
            content: output.clone(),
            blocks: vec![ContentBlock::ToolResult {
                id: id.into(),
                output,
            }],
            metadata: HashMap::new(),
        }
    }

    /// Attach structured blocks.
    #[must_use]
    pub fn with_blocks(mut self, blocks: Vec<ContentBlock>) -> Self {
        self.blocks = blocks;
        self
    }

    /// Attach a metadata annotation.
    #[must_use]
    pub fn with_metadata<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<serde_json::Value>,
    {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Whether this is a system message.
    pub fn is_system(&self) -> bool {
        self.role == MessageRole::System
    }

    /// Tool calls requested by this message.
    pub fn tool_calls(&self) -> impl Iterator<Item = &ContentBlock> {
        self.blocks
            .iter()
            .filter(|block| matches!(block, ContentBlock::ToolCall { .. }))
    }

    /// The text that would be transported for this message: the joined
    /// block payloads when blocks are present, the plain content otherwise.
    pub fn transport_text(&self) -> String {
        if self.blocks.is_empty() {
            self.content.clone()
        } else {
            self.blocks
                .iter()
                .map(ContentBlock::payload)
                .collect::<Vec<_>>()
                .join("\n")
        }
    }
}

impl std::fmt::Display for ChatMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.role, self.transport_text())
    }
}
