//! Self-summarizing chat memory.
//!
//! When the stored conversation grows past `summary_token_limit`, the oldest
//! messages are condensed by a summary LLM into one synthetic assistant
//! message. The synthetic message is tagged in its metadata so that a
//! snapshot taken with `get_all` can be restored with `set`.
//!
//! Layout of `get_all()`:
//!
//! ```text
//! [first system message]? [summary]? [live messages...]
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use ragline_core::config::{DEFAULT_SUMMARIZE_PROMPT, MemoryConfig};
use ragline_core::{
    ApproximateTokenizer, CallContext, ChatMessage, Llm, RaglineError, Result, Tokenizer,
    retry_once,
};
use tracing::{debug, info, instrument, warn};

use super::{ChatMemory, message_tokens, sticky_index};

/// Metadata key marking the synthetic summary message.
pub const SUMMARY_MARKER_KEY: &str = "ragline_summary";

/// Metadata key holding the number of original messages a summary covers.
pub const SUBSUMED_COUNT_KEY: &str = "subsumed_messages";

/// A rolling summary of evicted history.
#[derive(Debug, Clone, PartialEq)]
struct RollingSummary {
    text: String,
    subsumed: usize,
}

impl RollingSummary {
    fn to_message(&self) -> ChatMessage {
        ChatMessage::assistant(self.text.clone())
            .with_metadata(SUMMARY_MARKER_KEY, true)
            .with_metadata(SUBSUMED_COUNT_KEY, self.subsumed)
    }

    fn from_message(message: &ChatMessage) -> Self {
        let subsumed = message
            .metadata
            .get(SUBSUMED_COUNT_KEY)
            .and_then(serde_json::Value::as_u64)
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or(1);
        Self {
            text: message.content.clone(),
            subsumed,
        }
    }
}

fn is_summary(message: &ChatMessage) -> bool {
    message
        .metadata
        .get(SUMMARY_MARKER_KEY)
        .and_then(serde_json::Value::as_bool)
        .unwrap_or(false)
}

/// Stored state, replaced as a whole on every successful mutation.
#[derive(Debug, Clone, Default, PartialEq)]
struct SummaryState {
    system: Option<ChatMessage>,
    summary: Option<RollingSummary>,
    history: Vec<ChatMessage>,
}

impl SummaryState {
    fn messages(&self) -> Vec<ChatMessage> {
        let mut out = Vec::with_capacity(self.history.len() + 2);
        out.extend(self.system.clone());
        out.extend(self.summary.as_ref().map(RollingSummary::to_message));
        out.extend(self.history.iter().cloned());
        out
    }

    /// Split a flat message list into state, validating summary placement.
    fn parse(mut messages: Vec<ChatMessage>) -> Result<Self> {
        let system = sticky_index(&messages).map(|i| messages.remove(i));

        let markers: Vec<usize> = messages
            .iter()
            .enumerate()
            .filter(|(_, m)| is_summary(m))
            .map(|(i, _)| i)
            .collect();

        let summary = match markers.as_slice() {
            [] => None,
            [0] => Some(RollingSummary::from_message(&messages.remove(0))),
            [_] => {
                return Err(RaglineError::validation(
                    "summary message must be the first non-system message",
                ));
            }
            _ => {
                return Err(RaglineError::validation(
                    "at most one summary message is allowed",
                ));
            }
        };

        Ok(Self {
            system,
            summary,
            history: messages,
        })
    }
}

/// Chat memory that condenses its oldest messages into a rolling summary.
///
/// `summary_token_limit` is a hard bound on everything `get_all` returns:
/// the system message, the summary, and the live messages. When a mutation
/// goes over it, the previous summary and the shortest oldest prefix of live
/// messages that leaves room for a summary of the same size are sent to
/// `summary_llm`, and the reply replaces them as one assistant message. If
/// the new summary is longer than the old one and the buffer is still over,
/// further live messages are folded in the same way. A summary that alone
/// exceeds the room left by the system message is cut to its leading words.
///
/// The first system message is sticky and always sits in front, so one that
/// arrives after other turns is moved ahead of them.
///
/// A failing summary call is retried once on transport errors; if it still
/// fails the mutation fails and the memory is unchanged. Without new input no
/// summary call is made.
#[derive(Debug, Clone)]
pub struct SummaryMemory {
    state: SummaryState,
    summary_llm: Arc<dyn Llm>,
    summary_token_limit: usize,
    summarize_prompt: String,
    tokenizer: Arc<dyn Tokenizer>,
}

impl SummaryMemory {
    /// Create an empty memory with the default prompt and approximating
    /// tokenizer.
    pub fn new(summary_llm: Arc<dyn Llm>, summary_token_limit: usize) -> Self {
        Self {
            state: SummaryState::default(),
            summary_llm,
            summary_token_limit,
            summarize_prompt: DEFAULT_SUMMARIZE_PROMPT.to_string(),
            tokenizer: Arc::new(ApproximateTokenizer::default()),
        }
    }

    /// Create a memory from configuration.
    pub fn from_config(summary_llm: Arc<dyn Llm>, config: &MemoryConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(summary_llm, config.summary_token_limit)
            .with_summarize_prompt(config.summarize_prompt.clone())
            .with_tokenizer(ApproximateTokenizer::new(config.chars_per_token)))
    }

    /// Override the summarization instruction.
    #[must_use]
    pub fn with_summarize_prompt<S: Into<String>>(mut self, prompt: S) -> Self {
        self.summarize_prompt = prompt.into();
        self
    }

    /// Use a specific tokenizer.
    #[must_use]
    pub fn with_tokenizer<T: Tokenizer + 'static>(mut self, tokenizer: T) -> Self {
        self.tokenizer = Arc::new(tokenizer);
        self
    }

    /// Current summary text, if any history has been condensed.
    pub fn summary(&self) -> Option<&str> {
        self.state.summary.as_ref().map(|s| s.text.as_str())
    }

    /// Number of original messages covered by the current summary.
    pub fn subsumed_count(&self) -> usize {
        self.state.summary.as_ref().map_or(0, |s| s.subsumed)
    }

    fn tokens(&self, message: &ChatMessage) -> usize {
        message_tokens(self.tokenizer.as_ref(), message)
    }

    fn summary_tokens(&self, summary: Option<&RollingSummary>) -> usize {
        summary.map_or(0, |s| self.tokens(&s.to_message()))
    }

    /// Bring `state` under the limit, summarizing if needed.
    async fn condense(&self, mut state: SummaryState, ctx: &CallContext) -> Result<SummaryState> {
        let system_tokens = state.system.as_ref().map_or(0, |m| self.tokens(m));
        let Some(room) = self.summary_token_limit.checked_sub(system_tokens) else {
            return Err(RaglineError::configuration(format!(
                "system message needs {system_tokens} tokens but the summary token limit is {}",
                self.summary_token_limit
            )));
        };

        loop {
            let summary_tokens = self.summary_tokens(state.summary.as_ref());
            let sizes: Vec<usize> = state.history.iter().map(|m| self.tokens(m)).collect();
            let mut live = sizes.iter().sum::<usize>();
            if summary_tokens + live <= room {
                return Ok(state);
            }

            if state.history.is_empty() {
                if let Some(summary) = state.summary.as_mut() {
                    summary.text = self.truncate(&summary.text, room);
                    warn!(
                        tokens = summary_tokens,
                        room, "summary alone exceeds the token limit, truncated"
                    );
                }
                return Ok(state);
            }

            // Keep room for a replacement summary as large as the current one.
            let target = room.saturating_sub(summary_tokens);
            let mut prefix = 0;
            while prefix < sizes.len() && (prefix == 0 || live > target) {
                live -= sizes[prefix];
                prefix += 1;
            }

            let subsumed: Vec<ChatMessage> = state.history.drain(..prefix).collect();
            debug!(
                prefix,
                remaining = state.history.len(),
                "summarizing oldest messages"
            );

            let request = self.summary_request(state.summary.as_ref(), &subsumed);
            let text = retry_once(ctx, "summarize memory", || {
                self.summary_llm.chat(&request, ctx)
            })
            .await?;

            let covered = state.summary.as_ref().map_or(0, |s| s.subsumed) + subsumed.len();
            state.summary = Some(RollingSummary {
                text: text.trim().to_string(),
                subsumed: covered,
            });
            info!(subsumed = covered, "updated rolling conversation summary");
        }
    }

    /// Leading words of `text` that fit in `room` tokens.
    fn truncate(&self, text: &str, room: usize) -> String {
        let mut words: Vec<&str> = text.split_whitespace().collect();
        let mut kept = words.join(" ");
        while !words.is_empty() && self.tokenizer.count_tokens(&kept) > room {
            words.pop();
            kept = words.join(" ");
        }
        kept
    }

    fn summary_request(
        &self,
        previous: Option<&RollingSummary>,
        subsumed: &[ChatMessage],
    ) -> Vec<ChatMessage> {
        let mut transcript = String::new();
        if let Some(previous) = previous {
            transcript.push_str("Previous summary: ");
            transcript.push_str(&previous.text);
            transcript.push_str("\n\n");
        }
        let lines: Vec<String> = subsumed.iter().map(ToString::to_string).collect();
        transcript.push_str(&lines.join("\n"));

        vec![
            ChatMessage::system(self.summarize_prompt.clone()),
            ChatMessage::user(transcript),
        ]
    }
}

#[async_trait]
impl ChatMemory for SummaryMemory {
    /// The full snapshot; condensing happens on mutation, not on read.
    fn get(&self, _input: Option<&str>) -> Result<Vec<ChatMessage>> {
        Ok(self.state.messages())
    }

    fn get_all(&self) -> Vec<ChatMessage> {
        self.state.messages()
    }

    #[instrument(skip(self, messages, ctx), fields(count = messages.len()))]
    async fn put_messages(&mut self, messages: Vec<ChatMessage>, ctx: &CallContext) -> Result<()> {
        ctx.check("memory put")?;
        if messages.is_empty() {
            return Ok(());
        }

        let mut candidate = self.state.clone();
        for message in messages {
            if is_summary(&message) {
                return Err(RaglineError::validation(
                    "summary messages can only be installed with set",
                ));
            }
            if message.is_system() && candidate.system.is_none() {
                candidate.system = Some(message);
            } else {
                candidate.history.push(message);
            }
        }

        match self.condense(candidate, ctx).await {
            Ok(state) => {
                self.state = state;
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "summary memory mutation failed, state unchanged");
                Err(err)
            }
        }
    }

    async fn set(&mut self, messages: Vec<ChatMessage>, ctx: &CallContext) -> Result<()> {
        ctx.check("memory set")?;
        let candidate = SummaryState::parse(messages)?;
        self.state = self.condense(candidate, ctx).await?;
        Ok(())
    }

    fn reset(&mut self) {
        self.state = SummaryState::default();
    }

    fn name(&self) -> &'static str {
        "SummaryMemory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use ragline_core::WhitespaceTokenizer;
    use ragline_core::testing::ScriptedLlm;

    fn memory(llm: ScriptedLlm, limit: usize) -> (Arc<ScriptedLlm>, SummaryMemory) {
        let llm = Arc::new(llm);
        let memory = SummaryMemory::new(llm.clone(), limit).with_tokenizer(WhitespaceTokenizer);
        (llm, memory)
    }

    #[tokio::test]
    async fn test_no_summary_under_limit() {
        let ctx = CallContext::new();
        let (llm, mut memory) = memory(ScriptedLlm::new(Vec::<String>::new()), 20);
        memory.put(ChatMessage::user("a b c"), &ctx).await.unwrap();
        memory.put(ChatMessage::assistant("d e"), &ctx).await.unwrap();
        assert_eq!(llm.call_count(), 0);
        assert!(memory.summary().is_none());
    }

    #[tokio::test]
    async fn test_oldest_prefix_is_summarized() {
        let ctx = CallContext::new();
        let (llm, mut memory) = memory(ScriptedLlm::new(["greetings"]), 7);
        memory.put(ChatMessage::system("be brief"), &ctx).await.unwrap();
        memory.put(ChatMessage::user("hello there"), &ctx).await.unwrap();
        memory.put(ChatMessage::assistant("hi friend"), &ctx).await.unwrap();
        memory.put(ChatMessage::user("what now"), &ctx).await.unwrap();

        let all = memory.get_all();
        assert!(all[0].is_system());
        assert!(is_summary(&all[1]));
        assert_eq!(all[1].content, "greetings");
        assert_eq!(
            all[2..].to_vec(),
            vec![ChatMessage::assistant("hi friend"), ChatMessage::user("what now")]
        );
        assert_eq!(memory.subsumed_count(), 1);

        let prompts = llm.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains(DEFAULT_SUMMARIZE_PROMPT));
        assert!(prompts[0].contains("user: hello there"));
    }

    #[tokio::test]
    async fn test_failed_summary_leaves_state_unchanged() {
        let ctx = CallContext::new();
        let (llm, mut memory) = memory(
            ScriptedLlm::default().then_error(RaglineError::provider("quota exceeded")),
            3,
        );
        memory.put(ChatMessage::user("one two"), &ctx).await.unwrap();
        let before = memory.get_all();

        let err = memory
            .put(ChatMessage::assistant("three four"), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, RaglineError::Provider { .. }));
        assert_eq!(memory.get_all(), before);
        assert_eq!(llm.call_count(), 1);
    }

    #[tokio::test]
    async fn test_transport_failure_retried_once() {
        let ctx = CallContext::new();
        let (llm, mut memory) = memory(
            ScriptedLlm::default()
                .then_error(RaglineError::transport("reset"))
                .then_respond("condensed"),
            3,
        );
        memory.put(ChatMessage::user("a b"), &ctx).await.unwrap();
        memory.put(ChatMessage::user("c d"), &ctx).await.unwrap();
        assert_eq!(memory.summary(), Some("condensed"));
        assert_eq!(llm.call_count(), 2);
    }

    #[tokio::test]
    async fn test_summary_counts_toward_limit() {
        let ctx = CallContext::new();
        let (llm, mut memory) = memory(
            ScriptedLlm::new([
                "s1 s2 s3 s4 s5 s6 s7 s8 s9 s10",
                "t1 t2 t3 t4 t5 t6 t7 t8 t9 t10 t11 t12",
            ])
            .with_fallback("u1 u2 u3 u4 u5 u6 u7 u8"),
            4,
        );

        for text in ["a b c", "d e f", "g h i"] {
            memory.put(ChatMessage::user(text), &ctx).await.unwrap();
            let total: usize = memory.get_all().iter().map(|m| memory.tokens(m)).sum();
            assert!(total <= 4, "{total} tokens after putting {text:?}");
        }

        let all = memory.get_all();
        assert!(is_summary(&all[0]));
        assert_eq!(memory.subsumed_count() + all.len() - 1, 3);
        assert!(llm.prompts().iter().skip(1).all(|p| p.contains("Previous summary: ")));
    }

    #[tokio::test]
    async fn test_long_summary_folds_more_history() {
        let ctx = CallContext::new();
        let (llm, mut memory) = memory(ScriptedLlm::new(["x1 x2 x3", "y1"]), 7);
        memory
            .put_messages(
                vec![
                    ChatMessage::user("a b"),
                    ChatMessage::assistant("c d"),
                    ChatMessage::user("e f"),
                    ChatMessage::assistant("g h"),
                ],
                &ctx,
            )
            .await
            .unwrap();

        // "x1 x2 x3" plus 6 live tokens is over 7, so a second pass folds it
        // together with "c d".
        assert_eq!(llm.call_count(), 2);
        assert!(llm.prompts()[1].contains("Previous summary: x1 x2 x3"));
        assert_eq!(memory.summary(), Some("y1"));
        assert_eq!(
            memory.get_all()[1..].to_vec(),
            vec![ChatMessage::user("e f"), ChatMessage::assistant("g h")]
        );
        assert_eq!(memory.subsumed_count(), 2);
    }

    #[tokio::test]
    async fn test_system_message_is_hoisted_to_front() {
        let ctx = CallContext::new();
        let (_, mut memory) = memory(ScriptedLlm::default(), 100);
        memory.put(ChatMessage::user("hi"), &ctx).await.unwrap();
        memory.put(ChatMessage::system("be brief"), &ctx).await.unwrap();
        memory.put(ChatMessage::system("be kind"), &ctx).await.unwrap();

        assert_eq!(
            memory.get_all(),
            vec![
                ChatMessage::system("be brief"),
                ChatMessage::user("hi"),
                ChatMessage::system("be kind"),
            ]
        );
    }

    #[tokio::test]
    async fn test_set_rejects_misplaced_summary() {
        let ctx = CallContext::new();
        let (_, mut memory) = memory(ScriptedLlm::default(), 100);
        let summary = RollingSummary {
            text: "earlier".into(),
            subsumed: 2,
        }
        .to_message();

        let misplaced = vec![ChatMessage::user("hi"), summary.clone()];
        assert!(memory.set(misplaced, &ctx).await.is_err());

        let doubled = vec![summary.clone(), summary];
        assert!(memory.set(doubled, &ctx).await.is_err());
        assert_eq!(memory.message_count(), 0);
    }
}
