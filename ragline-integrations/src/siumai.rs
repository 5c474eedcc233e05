//! Chat models through the `siumai` client.

use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use ragline_core::{
    CallContext, ChatDelta, ChatMessage, Llm, LlmMetadata, LlmStream, MessageRole, RaglineError,
    Result, StreamingLlm,
};
use siumai::LlmError;
use siumai::prelude::*;
use tracing::{debug, instrument, warn};

use crate::ProviderSettings;

/// [`Llm`] and [`StreamingLlm`] over a siumai OpenAI-compatible client.
///
/// Network failures and 5xx responses map to [`RaglineError::Transport`],
/// which callers may retry once. Errors the provider returned on purpose
/// (authentication, quota, rate limits, 4xx, unparseable bodies) map to
/// [`RaglineError::Provider`]. A client that cannot be built is a
/// configuration error.
///
/// Streams carry text deltas only. Tool calls are not streamed, so
/// [`ChatDelta::tool_call`] is always `None`; this adapter does not implement
/// [`ragline_core::ToolCallingLlm`].
#[derive(Clone)]
pub struct SiumaiLlm {
    client: Arc<Siumai>,
    model: String,
}

impl std::fmt::Debug for SiumaiLlm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SiumaiLlm")
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl SiumaiLlm {
    /// Wrap an existing client.
    pub fn from_client<M: Into<String>>(client: Siumai, model: M) -> Self {
        Self {
            client: Arc::new(client),
            model: model.into(),
        }
    }

    /// Build an OpenAI-compatible client from settings.
    pub async fn openai(settings: &ProviderSettings) -> Result<Self> {
        settings.validate()?;
        debug!(model = %settings.model, "creating OpenAI client");

        let mut builder = Siumai::builder()
            .openai()
            .api_key(&settings.api_key)
            .model(&settings.model);
        if let Some(temperature) = settings.temperature {
            builder = builder.temperature(temperature);
        }
        if let Some(max_tokens) = settings.max_tokens {
            builder = builder.max_tokens(max_tokens);
        }
        if let Some(base_url) = &settings.base_url {
            builder = builder.base_url(base_url);
        }

        let client = builder.build().await.map_err(|e| {
            RaglineError::configuration(format!("Failed to create OpenAI client: {e}"))
        })?;
        Ok(Self::from_client(client, settings.model.clone()))
    }

    /// Build an OpenAI client from `OPENAI_API_KEY` and `OPENAI_URL`.
    pub async fn openai_from_env<M: Into<String>>(model: M) -> Result<Self> {
        let settings = ProviderSettings::openai_from_env(model)?;
        Self::openai(&settings).await
    }

    fn convert_messages(messages: &[ChatMessage]) -> Vec<siumai::types::ChatMessage> {
        messages
            .iter()
            .map(|message| match message.role {
                MessageRole::System => {
                    siumai::types::ChatMessage::system(message.transport_text()).build()
                }
                MessageRole::Assistant => {
                    siumai::types::ChatMessage::assistant(message.transport_text()).build()
                }
                MessageRole::User | MessageRole::Tool => {
                    siumai::types::ChatMessage::user(message.transport_text()).build()
                }
            })
            .collect()
    }
}

#[async_trait]
impl Llm for SiumaiLlm {
    fn metadata(&self) -> LlmMetadata {
        LlmMetadata::new(self.model.clone())
            .with_chat(true)
            .with_function_calling(false)
    }

    async fn complete(&self, prompt: &str, ctx: &CallContext) -> Result<String> {
        self.chat(&[ChatMessage::user(prompt)], ctx).await
    }

    #[instrument(skip(self, messages, ctx), fields(model = %self.model, messages = messages.len()))]
    async fn chat(&self, messages: &[ChatMessage], ctx: &CallContext) -> Result<String> {
        let request = Self::convert_messages(messages);
        let response = ctx
            .run("chat", async {
                self.client.chat(request).await.map_err(|e| {
                    warn!("LLM generation failed: {e}");
                    map_llm_error("Siumai chat failed", &e)
                })
            })
            .await?;
        Ok(response.content.all_text())
    }
}

#[async_trait]
impl StreamingLlm for SiumaiLlm {
    async fn stream(&self, prompt: &str, ctx: &CallContext) -> Result<LlmStream<String>> {
        let deltas = self.stream_chat(&[ChatMessage::user(prompt)], ctx).await?;
        Ok(Box::pin(deltas.map(|delta| delta.map(|d| d.delta))))
    }

    #[instrument(skip(self, messages, ctx), fields(model = %self.model))]
    async fn stream_chat(
        &self,
        messages: &[ChatMessage],
        ctx: &CallContext,
    ) -> Result<LlmStream<ChatDelta>> {
        let request = Self::convert_messages(messages);
        let stream = ctx
            .run("stream chat", async {
                self.client
                    .chat_stream(request, None)
                    .await
                    .map_err(|e| map_llm_error("Failed to start streaming", &e))
            })
            .await?;

        let deltas = stream
            .filter_map(|event| async move {
                match event {
                    Ok(siumai::types::ChatStreamEvent::ContentDelta { delta, .. }) => {
                        Some(Ok(delta))
                    }
                    Ok(_) => None,
                    Err(e) => Some(Err(map_llm_error("Stream error", &e))),
                }
            })
            .enumerate()
            .map(|(index, item)| {
                item.map(|text| {
                    let mut delta = ChatDelta::text(text);
                    if index == 0 {
                        delta.role = Some(MessageRole::Assistant);
                    }
                    delta
                })
            });

        Ok(Box::pin(ctx.guard_stream(deltas)))
    }
}

/// Split siumai failures into retryable transport errors and final provider
/// errors.
fn map_llm_error(operation: &str, err: &LlmError) -> RaglineError {
    let message = format!("{operation}: {err}");
    match err {
        LlmError::HttpError(_) | LlmError::ConnectionError(_) | LlmError::TimeoutError(_) => {
            RaglineError::transport(message)
        }
        LlmError::ApiError { code, .. } if *code >= 500 => RaglineError::transport(message),
        _ => RaglineError::provider(message),
    }
}
