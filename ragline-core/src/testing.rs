//! Deterministic LLM and embedding doubles for tests.
//!
//! Enabled inside this crate's own tests and, for downstream crates, through
//! the `testing` feature.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::stream::stream_channel;
use crate::{
    CallContext, ChatDelta, ChatMessage, ChatResponse, ContentBlock, Embedder, Llm, LlmMetadata,
    LlmStream, MessageRole, RaglineError, ResponseFormat, Result, StreamingLlm,
    StructuredOutputLlm, ToolCallingLlm, ToolChoice, ToolSpec,
};

type Responder = Arc<dyn Fn(&str) -> Result<String> + Send + Sync>;

/// An LLM that replays scripted responses.
///
/// Responses are taken from a queue in call order. A responder closure, when
/// set, is consulted instead of the queue and sees the rendered prompt, which
/// keeps concurrent callers deterministic. Every prompt is recorded.
///
/// Chat prompts are recorded as one `role: text` line per message.
pub struct ScriptedLlm {
    queue: Mutex<VecDeque<Result<String>>>,
    responder: Option<Responder>,
    fallback: Option<String>,
    prompts: Mutex<Vec<String>>,
    metadata: LlmMetadata,
    delay: Option<Duration>,
    tool_calls: AtomicUsize,
}

impl std::fmt::Debug for ScriptedLlm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedLlm")
            .field("metadata", &self.metadata)
            .field("calls", &self.call_count())
            .finish_non_exhaustive()
    }
}

impl Default for ScriptedLlm {
    fn default() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            responder: None,
            fallback: None,
            prompts: Mutex::new(Vec::new()),
            metadata: LlmMetadata::new("scripted")
                .with_chat(true)
                .with_function_calling(true)
                .with_structured_output(true),
            delay: None,
            tool_calls: AtomicUsize::new(0),
        }
    }
}

impl ScriptedLlm {
    /// Replay `responses` in order.
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let llm = Self::default();
        {
            let mut queue = llm.queue.lock().unwrap_or_else(PoisonError::into_inner);
            queue.extend(responses.into_iter().map(|r| Ok(r.into())));
        }
        llm
    }

    /// Answer every prompt with `responder`.
    pub fn from_fn<F>(responder: F) -> Self
    where
        F: Fn(&str) -> Result<String> + Send + Sync + 'static,
    {
        Self {
            responder: Some(Arc::new(responder)),
            ..Default::default()
        }
    }

    /// Queue an error as the next outcome.
    #[must_use]
    pub fn then_error(self, error: RaglineError) -> Self {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(Err(error));
        self
    }

    /// Queue a response as the next outcome.
    #[must_use]
    pub fn then_respond<S: Into<String>>(self, response: S) -> Self {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(Ok(response.into()));
        self
    }

    /// Response used once the queue is empty.
    #[must_use]
    pub fn with_fallback<S: Into<String>>(mut self, response: S) -> Self {
        self.fallback = Some(response.into());
        self
    }

    /// Override the reported metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: LlmMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Sleep before each response (and between stream chunks).
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Prompts received so far.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of calls received so far.
    pub fn call_count(&self) -> usize {
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn next_response(&self, prompt: &str) -> Result<String> {
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(prompt.to_string());

        if let Some(responder) = &self.responder {
            return responder(prompt);
        }

        let queued = self
            .queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        match (queued, &self.fallback) {
            (Some(outcome), _) => outcome,
            (None, Some(fallback)) => Ok(fallback.clone()),
            (None, None) => Err(RaglineError::internal("scripted LLM has no responses left")),
        }
    }

    async fn respond(&self, prompt: String, ctx: &CallContext) -> Result<String> {
        ctx.run("scripted llm", async {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.next_response(&prompt)
        })
        .await
    }

    fn render_chat(messages: &[ChatMessage]) -> String {
        messages
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn chunks(text: &str) -> Vec<String> {
        text.split_inclusive(' ').map(str::to_string).collect()
    }
}

#[async_trait]
impl Llm for ScriptedLlm {
    fn metadata(&self) -> LlmMetadata {
        self.metadata.clone()
    }

    async fn complete(&self, prompt: &str, ctx: &CallContext) -> Result<String> {
        self.respond(prompt.to_string(), ctx).await
    }

    async fn chat(&self, messages: &[ChatMessage], ctx: &CallContext) -> Result<String> {
        self.respond(Self::render_chat(messages), ctx).await
    }
}

#[async_trait]
impl StreamingLlm for ScriptedLlm {
    async fn stream(&self, prompt: &str, ctx: &CallContext) -> Result<LlmStream<String>> {
        let text = self.next_response(prompt)?;
        let (tx, stream) = stream_channel(4, ctx);
        let delay = self.delay;
        tokio::spawn(async move {
            for chunk in Self::chunks(&text) {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                if !tx.send(Ok(chunk)).await {
                    break;
                }
            }
        });
        Ok(stream)
    }

    async fn stream_chat(
        &self,
        messages: &[ChatMessage],
        ctx: &CallContext,
    ) -> Result<LlmStream<ChatDelta>> {
        let text = self.next_response(&Self::render_chat(messages))?;
        let (tx, stream) = stream_channel(4, ctx);
        let delay = self.delay;
        tokio::spawn(async move {
            for (i, chunk) in Self::chunks(&text).into_iter().enumerate() {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                let mut delta = ChatDelta::text(chunk);
                if i == 0 {
                    delta.role = Some(MessageRole::Assistant);
                }
                if !tx.send(Ok(delta)).await {
                    break;
                }
            }
        });
        Ok(stream)
    }
}

#[async_trait]
impl ToolCallingLlm for ScriptedLlm {
    /// A scripted response of the form
    /// `{"tool": "<name>", "arguments": {...}}` becomes a tool call; any
    /// other response is plain assistant text.
    async fn chat_with_tools(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolSpec],
        tool_choice: Option<&ToolChoice>,
        ctx: &CallContext,
    ) -> Result<ChatResponse> {
        if let Some(ToolChoice::Tool(name)) = tool_choice {
            if !tools.iter().any(|tool| &tool.name == name) {
                return Err(RaglineError::validation(format!(
                    "tool choice names unknown tool: {name}"
                )));
            }
        }

        let text = self.respond(Self::render_chat(messages), ctx).await?;
        let call = serde_json::from_str::<serde_json::Value>(&text)
            .ok()
            .and_then(|value| {
                let name = value.get("tool")?.as_str()?.to_string();
                let arguments = value.get("arguments").cloned().unwrap_or_default();
                Some((name, arguments.to_string()))
            });

        let message = match call {
            Some((name, arguments)) => {
                let id = format!("call_{}", self.tool_calls.fetch_add(1, Ordering::SeqCst) + 1);
                ChatMessage::assistant("").with_blocks(vec![ContentBlock::ToolCall {
                    name,
                    arguments,
                    id,
                }])
            }
            None => ChatMessage::assistant(text),
        };
        Ok(ChatResponse::from_message(message))
    }
}

#[async_trait]
impl StructuredOutputLlm for ScriptedLlm {
    async fn chat_with_format(
        &self,
        messages: &[ChatMessage],
        format: &ResponseFormat,
        ctx: &CallContext,
    ) -> Result<String> {
        let text = self.respond(Self::render_chat(messages), ctx).await?;
        format.validate(&text)?;
        Ok(text)
    }
}

/// An embedder with a fixed text-to-vector table.
#[derive(Debug, Default)]
pub struct StaticEmbedder {
    vectors: HashMap<String, Vec<f32>>,
    dimension: usize,
    calls: AtomicUsize,
}

impl StaticEmbedder {
    /// Create an empty embedder reporting `dimension`.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            ..Default::default()
        }
    }

    /// Register the vector returned for `text`.
    #[must_use]
    pub fn with<S: Into<String>>(mut self, text: S, vector: Vec<f32>) -> Self {
        self.vectors.insert(text.into(), vector);
        self
    }

    /// Number of texts embedded so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embedder for StaticEmbedder {
    async fn get_text_embedding(&self, text: &str, ctx: &CallContext) -> Result<Vec<f32>> {
        ctx.check("static embedding")?;
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.vectors
            .get(text)
            .cloned()
            .ok_or_else(|| RaglineError::provider(format!("no embedding registered for '{text}'")))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "static"
    }
}
