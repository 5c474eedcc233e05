//! Capability-typed LLM interfaces.
//!
//! Each capability is a separate trait layered on top of [`Llm`], so a
//! component that needs tool calling asks for `Arc<dyn ToolCallingLlm>` and a
//! provider without that capability cannot be passed in by mistake.
//!
//! Implementations report transport failures as
//! [`RaglineError::Transport`] and provider error payloads as
//! [`RaglineError::Provider`]. They never retry on their own; see
//! [`crate::retry_once`] for the caller-side policy.

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

use crate::{CallContext, ChatMessage, ContentBlock, MessageRole, RaglineError, Result};

/// A finite, non-restartable sequence of results produced by a provider.
pub type LlmStream<T> = Pin<Box<dyn Stream<Item = Result<T>> + Send>>;

/// Static description of a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmMetadata {
    /// Model name.
    pub model_name: String,
    /// Total context window in tokens.
    pub context_window: usize,
    /// Tokens reserved for the model's output.
    pub num_output_tokens: usize,
    /// Whether the model is chat-native.
    pub is_chat: bool,
    /// Whether the model can emit tool calls.
    pub is_function_calling: bool,
    /// Whether the model supports JSON / schema-constrained output.
    pub supports_structured_output: bool,
}

impl Default for LlmMetadata {
    fn default() -> Self {
        Self {
            model_name: "unknown".to_string(),
            context_window: 3900,
            num_output_tokens: 256,
            is_chat: false,
            is_function_calling: false,
            supports_structured_output: false,
        }
    }
}

impl LlmMetadata {
    /// Metadata for a named model with default limits.
    pub fn new<S: Into<String>>(model_name: S) -> Self {
        Self {
            model_name: model_name.into(),
            ..Default::default()
        }
    }

    /// Set the context window and output reservation.
    #[must_use]
    pub fn with_limits(mut self, context_window: usize, num_output_tokens: usize) -> Self {
        self.context_window = context_window;
        self.num_output_tokens = num_output_tokens;
        self
    }

    /// Mark the model as chat-native.
    #[must_use]
    pub fn with_chat(mut self, is_chat: bool) -> Self {
        self.is_chat = is_chat;
        self
    }

    /// Mark the model as tool-calling capable.
    #[must_use]
    pub fn with_function_calling(mut self, enabled: bool) -> Self {
        self.is_function_calling = enabled;
        self
    }

    /// Mark the model as supporting structured output.
    #[must_use]
    pub fn with_structured_output(mut self, enabled: bool) -> Self {
        self.supports_structured_output = enabled;
        self
    }

    /// Tokens left for the prompt once the output reservation is taken.
    pub fn available_prompt_tokens(&self) -> usize {
        self.context_window.saturating_sub(self.num_output_tokens)
    }
}

/// Result of a tool-enabled chat turn.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatResponse {
    /// Assistant text (may be empty when only tool calls were produced).
    pub text: String,
    /// Full assistant message; `blocks` may carry tool calls.
    pub message: ChatMessage,
}

impl ChatResponse {
    /// Build a response from an assistant message.
    pub fn from_message(message: ChatMessage) -> Self {
        Self {
            text: message.content.clone(),
            message,
        }
    }

    /// Tool calls requested by the assistant.
    pub fn tool_calls(&self) -> Vec<&ContentBlock> {
        self.message.tool_calls().collect()
    }
}

/// One event of a streaming chat.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChatDelta {
    /// Text fragment.
    pub delta: String,
    /// Role, usually present on the first event only.
    pub role: Option<MessageRole>,
    /// A tool call assembled by the provider, if this event carries one.
    pub tool_call: Option<ContentBlock>,
}

impl ChatDelta {
    /// A plain text delta.
    pub fn text<S: Into<String>>(delta: S) -> Self {
        Self {
            delta: delta.into(),
            ..Default::default()
        }
    }
}

/// Description of a tool the model may call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Tool name.
    pub name: String,
    /// What the tool does.
    pub description: String,
    /// JSON schema of the arguments object.
    pub parameters: serde_json::Value,
}

impl ToolSpec {
    /// Create a tool description.
    pub fn new<N: Into<String>, D: Into<String>>(
        name: N,
        description: D,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

/// How the model should choose among tools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolChoice {
    /// Model decides.
    Auto,
    /// Never call tools.
    None,
    /// Must call at least one tool.
    Required,
    /// Must call the named tool.
    Tool(String),
}

/// Requested structure of a chat response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseFormat {
    /// Any JSON object.
    JsonObject,
    /// JSON matching a schema.
    JsonSchema {
        /// Schema name.
        name: String,
        /// The JSON schema.
        schema: serde_json::Value,
    },
}

impl ResponseFormat {
    /// Check that `text` satisfies this format and return the parsed value.
    ///
    /// `JsonObject` requires a JSON object. `JsonSchema` requires valid JSON
    /// and, when the schema declares an object with `required` keys, that
    /// those keys are present.
    pub fn validate(&self, text: &str) -> Result<serde_json::Value> {
        let value: serde_json::Value = serde_json::from_str(text.trim())
            .map_err(|e| RaglineError::format(format!("response is not valid JSON: {e}")))?;

        match self {
            Self::JsonObject => {
                if !value.is_object() {
                    return Err(RaglineError::format("response is JSON but not an object"));
                }
            }
            Self::JsonSchema { name, schema } => {
                let required = schema
                    .get("required")
                    .and_then(serde_json::Value::as_array)
                    .map(|keys| keys.iter().filter_map(serde_json::Value::as_str).collect::<Vec<_>>())
                    .unwrap_or_default();
                if !required.is_empty() {
                    let object = value.as_object().ok_or_else(|| {
                        RaglineError::format(format!("schema '{name}' expects an object"))
                    })?;
                    if let Some(missing) = required.iter().find(|key| !object.contains_key(**key)) {
                        return Err(RaglineError::format(format!(
                            "schema '{name}' requires key '{missing}'"
                        )));
                    }
                }
            }
        }

        Ok(value)
    }
}

/// Base LLM capability: single-shot completion and chat.
#[async_trait]
pub trait Llm: Send + Sync + std::fmt::Debug {
    /// Describe the model.
    fn metadata(&self) -> LlmMetadata;

    /// Single-shot text generation.
    async fn complete(&self, prompt: &str, ctx: &CallContext) -> Result<String>;

    /// Assistant text for a conversation.
    async fn chat(&self, messages: &[ChatMessage], ctx: &CallContext) -> Result<String>;

    /// Mirrors [`LlmMetadata::is_function_calling`].
    fn supports_tool_calling(&self) -> bool {
        self.metadata().is_function_calling
    }

    /// Mirrors [`LlmMetadata::supports_structured_output`].
    fn supports_structured_output(&self) -> bool {
        self.metadata().supports_structured_output
    }
}

/// Streaming generation.
///
/// Streams are ordered, finite, and stop yielding once the context is
/// cancelled.
#[async_trait]
pub trait StreamingLlm: Llm {
    /// Stream completion chunks for a prompt.
    async fn stream(&self, prompt: &str, ctx: &CallContext) -> Result<LlmStream<String>>;

    /// Stream chat deltas for a conversation.
    async fn stream_chat(
        &self,
        messages: &[ChatMessage],
        ctx: &CallContext,
    ) -> Result<LlmStream<ChatDelta>>;
}

/// Tool calling.
///
/// The returned message may carry [`ContentBlock::ToolCall`] blocks; the
/// caller executes them and resubmits [`ContentBlock::ToolResult`] blocks in
/// a follow-up [`Llm::chat`].
#[async_trait]
pub trait ToolCallingLlm: Llm {
    /// Chat with a set of callable tools.
    async fn chat_with_tools(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolSpec],
        tool_choice: Option<&ToolChoice>,
        ctx: &CallContext,
    ) -> Result<ChatResponse>;
}

/// Structured (JSON) output.
#[async_trait]
pub trait StructuredOutputLlm: Llm {
    /// Chat constrained to `format`. Implementations validate the output
    /// with [`ResponseFormat::validate`] and fail with a format error.
    async fn chat_with_format(
        &self,
        messages: &[ChatMessage],
        format: &ResponseFormat,
        ctx: &CallContext,
    ) -> Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_metadata_prompt_budget() {
        let meta = LlmMetadata::new("gpt-4o-mini").with_limits(16_000, 1_000);
        assert_eq!(meta.available_prompt_tokens(), 15_000);
        assert_eq!(LlmMetadata::new("tiny").with_limits(10, 50).available_prompt_tokens(), 0);
    }

    #[test]
    fn test_json_object_format() {
        assert!(ResponseFormat::JsonObject.validate(r#"{"a": 1}"#).is_ok());
        let err = ResponseFormat::JsonObject.validate("Sure! {\"a\": 1}").unwrap_err();
        assert!(matches!(err, RaglineError::Format { .. }));
        assert!(ResponseFormat::JsonObject.validate("[1, 2]").is_err());
    }

    #[test]
    fn test_json_schema_required_keys() {
        let format = ResponseFormat::JsonSchema {
            name: "verdict".into(),
            schema: json!({"type": "object", "required": ["passing", "reason"]}),
        };
        assert!(format.validate(r#"{"passing": true, "reason": "ok"}"#).is_ok());
        assert!(format.validate(r#"{"passing": true}"#).is_err());
    }
}
