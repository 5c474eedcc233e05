//! Token-bounded chat memory.

use std::sync::Arc;

use async_trait::async_trait;
use ragline_core::config::MemoryConfig;
use ragline_core::{
    ApproximateTokenizer, CallContext, ChatMessage, Llm, RaglineError, Result, Tokenizer,
};
use tracing::{debug, info, instrument};

use super::{ChatMemory, message_tokens, sticky_index};

/// Chat memory that evicts the oldest whole messages to stay within a token
/// limit.
///
/// The first system message is sticky: it is never evicted but counts toward
/// the limit. A mutation that would leave the sticky message alone over the
/// limit fails with a configuration error and changes nothing.
///
/// # Examples
///
/// ```rust
/// use ragline_core::{CallContext, ChatMessage, WhitespaceTokenizer};
/// use ragline_query::memory::{ChatMemory, TokenBufferMemory};
///
/// # async fn example() -> ragline_core::Result<()> {
/// let ctx = CallContext::new();
/// let mut memory = TokenBufferMemory::new(10).with_tokenizer(WhitespaceTokenizer);
/// memory.put(ChatMessage::user("one two three four"), &ctx).await?;
/// memory.put(ChatMessage::assistant("five six seven eight nine ten eleven"), &ctx).await?;
/// assert_eq!(memory.message_count(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct TokenBufferMemory {
    messages: Vec<ChatMessage>,
    token_limit: usize,
    tokenizer: Arc<dyn Tokenizer>,
}

impl TokenBufferMemory {
    /// Create an empty memory with the approximating tokenizer.
    pub fn new(token_limit: usize) -> Self {
        Self {
            messages: Vec::new(),
            token_limit,
            tokenizer: Arc::new(ApproximateTokenizer::default()),
        }
    }

    /// Create a memory from configuration.
    pub fn from_config(config: &MemoryConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(config.token_limit)
            .with_tokenizer(ApproximateTokenizer::new(config.chars_per_token)))
    }

    /// Size the token limit from an LLM's context window: 75% of the prompt
    /// budget (`context_window - num_output_tokens`), at least 1.
    pub fn from_llm(llm: &dyn Llm) -> Self {
        let metadata = llm.metadata();
        let token_limit = (metadata.available_prompt_tokens() * 3 / 4).max(1);
        debug!(
            model = %metadata.model_name,
            token_limit,
            "sizing token buffer from model metadata"
        );
        Self::new(token_limit)
    }

    /// Use a specific tokenizer.
    #[must_use]
    pub fn with_tokenizer<T: Tokenizer + 'static>(mut self, tokenizer: T) -> Self {
        self.tokenizer = Arc::new(tokenizer);
        self
    }

    /// Use a shared tokenizer.
    #[must_use]
    pub fn with_shared_tokenizer(mut self, tokenizer: Arc<dyn Tokenizer>) -> Self {
        self.tokenizer = tokenizer;
        self
    }

    /// The configured token limit.
    pub fn token_limit(&self) -> usize {
        self.token_limit
    }

    /// Total tokens of the stored messages.
    pub fn total_tokens(&self) -> usize {
        self.count(&self.messages)
    }

    fn count(&self, messages: &[ChatMessage]) -> usize {
        messages
            .iter()
            .map(|m| message_tokens(self.tokenizer.as_ref(), m))
            .sum()
    }

    /// Evict from the front of `messages` until they fit.
    fn fit(&self, mut messages: Vec<ChatMessage>) -> Result<Vec<ChatMessage>> {
        let mut sizes: Vec<usize> = messages
            .iter()
            .map(|m| message_tokens(self.tokenizer.as_ref(), m))
            .collect();
        let mut total: usize = sizes.iter().sum();
        let mut sticky = sticky_index(&messages);
        let mut evicted = 0usize;

        while total > self.token_limit {
            let victim = match sticky {
                Some(0) if messages.len() > 1 => 1,
                Some(0) => {
                    return Err(RaglineError::configuration(format!(
                        "system message needs {total} tokens but the token limit is {}",
                        self.token_limit
                    )));
                }
                _ => 0,
            };
            total -= sizes.remove(victim);
            messages.remove(victim);
            evicted += 1;
            sticky = sticky.map(|i| if i > victim { i - 1 } else { i });
        }

        if evicted > 0 {
            info!(evicted, total, limit = self.token_limit, "evicted messages from token buffer");
        }
        Ok(messages)
    }
}

#[async_trait]
impl ChatMemory for TokenBufferMemory {
    /// The newest messages that fit together with `input`; the sticky system
    /// message is always included.
    fn get(&self, input: Option<&str>) -> Result<Vec<ChatMessage>> {
        let input_tokens = input.map_or(0, |text| self.tokenizer.count_tokens(text));
        let sticky = sticky_index(&self.messages);
        let sticky_tokens = sticky.map_or(0, |i| {
            message_tokens(self.tokenizer.as_ref(), &self.messages[i])
        });

        let reserved = sticky_tokens + input_tokens;
        if reserved > self.token_limit {
            return Err(RaglineError::configuration(format!(
                "system message and input need {reserved} tokens but the token limit is {}",
                self.token_limit
            )));
        }

        let mut budget = self.token_limit - reserved;
        let mut start = self.messages.len();
        for (i, message) in self.messages.iter().enumerate().rev() {
            if Some(i) == sticky {
                continue;
            }
            let tokens = message_tokens(self.tokenizer.as_ref(), message);
            if tokens > budget {
                break;
            }
            budget -= tokens;
            start = i;
        }

        Ok(self
            .messages
            .iter()
            .enumerate()
            .filter(|(i, _)| *i >= start || Some(*i) == sticky)
            .map(|(_, m)| m.clone())
            .collect())
    }

    fn get_all(&self) -> Vec<ChatMessage> {
        self.messages.clone()
    }

    #[instrument(skip(self, messages, ctx), fields(count = messages.len(), limit = self.token_limit))]
    async fn put_messages(&mut self, messages: Vec<ChatMessage>, ctx: &CallContext) -> Result<()> {
        ctx.check("memory put")?;
        let mut candidate = self.messages.clone();
        candidate.extend(messages);
        self.messages = self.fit(candidate)?;
        Ok(())
    }

    async fn set(&mut self, messages: Vec<ChatMessage>, ctx: &CallContext) -> Result<()> {
        ctx.check("memory set")?;
        self.messages = self.fit(messages)?;
        Ok(())
    }

    fn reset(&mut self) {
        self.messages.clear();
    }

    fn message_count(&self) -> usize {
        self.messages.len()
    }

    fn name(&self) -> &'static str {
        "TokenBufferMemory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragline_core::testing::ScriptedLlm;
    use ragline_core::{LlmMetadata, WhitespaceTokenizer};
    use test_case::test_case;

    fn words(n: usize) -> String {
        (0..n).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ")
    }

    fn sizes(memory: &TokenBufferMemory) -> Vec<usize> {
        memory
            .get_all()
            .iter()
            .map(|m| m.content.split_whitespace().count())
            .collect()
    }

    #[tokio::test]
    async fn test_sticky_system_message_survives() {
        let ctx = CallContext::new();
        let mut memory = TokenBufferMemory::new(6).with_tokenizer(WhitespaceTokenizer);
        memory.put(ChatMessage::system(words(2)), &ctx).await.unwrap();
        memory.put(ChatMessage::user(words(3)), &ctx).await.unwrap();
        memory.put(ChatMessage::assistant(words(3)), &ctx).await.unwrap();

        let all = memory.get_all();
        assert!(all[0].is_system());
        assert_eq!(sizes(&memory), vec![2, 3]);
        assert!(memory.total_tokens() <= 6);
    }

    #[tokio::test]
    async fn test_oversized_system_message_fails_without_change() {
        let ctx = CallContext::new();
        let mut memory = TokenBufferMemory::new(4).with_tokenizer(WhitespaceTokenizer);
        memory.put(ChatMessage::user(words(2)), &ctx).await.unwrap();

        let err = memory
            .put(ChatMessage::system(words(5)), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, RaglineError::Configuration { .. }));
        assert_eq!(sizes(&memory), vec![2]);
    }

    #[tokio::test]
    async fn test_only_first_system_message_is_sticky() {
        let ctx = CallContext::new();
        let mut memory = TokenBufferMemory::new(5).with_tokenizer(WhitespaceTokenizer);
        memory
            .set(
                vec![
                    ChatMessage::system(words(1)),
                    ChatMessage::system(words(2)),
                    ChatMessage::user(words(3)),
                ],
                &ctx,
            )
            .await
            .unwrap();
        assert_eq!(sizes(&memory), vec![1, 3]);
    }

    #[test_case(None, vec![2, 3, 4] ; "no input")]
    #[test_case(Some("a b c d"), vec![2, 4] ; "input reserves room")]
    fn test_get_reserves_input_tokens(input: Option<&str>, expected: Vec<usize>) {
        let memory = TokenBufferMemory {
            messages: vec![
                ChatMessage::system(words(2)),
                ChatMessage::user(words(3)),
                ChatMessage::assistant(words(4)),
            ],
            token_limit: 10,
            tokenizer: Arc::new(WhitespaceTokenizer),
        };
        let got: Vec<usize> = memory
            .get(input)
            .unwrap()
            .iter()
            .map(|m| m.content.split_whitespace().count())
            .collect();
        assert_eq!(got, expected);
    }

    #[test]
    fn test_from_llm_uses_three_quarters_of_prompt_budget() {
        let llm = ScriptedLlm::default().with_metadata(LlmMetadata::new("m").with_limits(4096, 96));
        assert_eq!(TokenBufferMemory::from_llm(&llm).token_limit(), 3000);

        let tiny = ScriptedLlm::default().with_metadata(LlmMetadata::new("t").with_limits(1, 1));
        assert_eq!(TokenBufferMemory::from_llm(&tiny).token_limit(), 1);
    }

    #[test]
    fn test_from_config_rejects_zero_limit() {
        let config = MemoryConfig::new(0);
        assert!(TokenBufferMemory::from_config(&config).is_err());
    }
}
