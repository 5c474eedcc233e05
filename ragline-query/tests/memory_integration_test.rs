//! Integration tests for the memory system.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use ragline_core::testing::ScriptedLlm;
use ragline_core::{CallContext, ChatMessage, RaglineError, Tokenizer, WhitespaceTokenizer};
use ragline_query::memory::{
    AnyMemory, ChatMemory, SUMMARY_MARKER_KEY, SimpleMemory, SummaryMemory, TokenBufferMemory,
};
use test_case::test_case;

fn words(n: usize, tag: &str) -> String {
    (0..n).map(|i| format!("{tag}{i}")).collect::<Vec<_>>().join(" ")
}

fn sizes(messages: &[ChatMessage]) -> Vec<usize> {
    messages
        .iter()
        .map(|m| WhitespaceTokenizer.count_tokens(&m.content))
        .collect()
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn is_summary(message: &ChatMessage) -> bool {
    message.metadata.contains_key(SUMMARY_MARKER_KEY)
}

#[tokio::test]
async fn test_token_buffer_eviction_sequence() {
    let ctx = CallContext::new();
    let mut memory = TokenBufferMemory::new(10).with_tokenizer(WhitespaceTokenizer);

    memory.put(ChatMessage::user(words(4, "a")), &ctx).await.unwrap();
    assert_eq!(sizes(&memory.get_all()), vec![4]);

    memory.put(ChatMessage::assistant(words(3, "b")), &ctx).await.unwrap();
    assert_eq!(sizes(&memory.get_all()), vec![4, 3]);

    memory.put(ChatMessage::user(words(5, "c")), &ctx).await.unwrap();
    assert_eq!(sizes(&memory.get_all()), vec![3, 5]);
    assert_eq!(memory.total_tokens(), 8);

    memory.put(ChatMessage::assistant(words(6, "d")), &ctx).await.unwrap();
    assert_eq!(sizes(&memory.get_all()), vec![6]);
    assert_eq!(memory.total_tokens(), 6);
}

#[tokio::test]
async fn test_token_buffer_bound_holds_after_every_put() {
    let ctx = CallContext::new();
    let mut memory = TokenBufferMemory::new(12).with_tokenizer(WhitespaceTokenizer);
    memory.put(ChatMessage::system(words(3, "s")), &ctx).await.unwrap();

    for (i, n) in [2, 7, 1, 4, 9, 3, 5, 2, 8].into_iter().enumerate() {
        let message = if i % 2 == 0 {
            ChatMessage::user(words(n, "u"))
        } else {
            ChatMessage::assistant(words(n, "a"))
        };
        memory.put(message, &ctx).await.unwrap();

        let all = memory.get_all();
        assert!(all[0].is_system(), "system message must stay first");
        assert!(
            memory.total_tokens() <= 12,
            "total {} exceeds limit after put #{i}",
            memory.total_tokens()
        );
    }
}

#[tokio::test]
async fn test_token_buffer_rejects_batch_with_oversized_system() {
    let ctx = CallContext::new();
    let mut memory = TokenBufferMemory::new(5).with_tokenizer(WhitespaceTokenizer);
    memory.put(ChatMessage::user("kept"), &ctx).await.unwrap();

    let err = memory
        .put_messages(
            vec![ChatMessage::system(words(8, "s")), ChatMessage::user("hi")],
            &ctx,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, RaglineError::Configuration { .. }));
    assert_eq!(memory.get_all(), vec![ChatMessage::user("kept")]);
}

#[tokio::test]
async fn test_summary_memory_covers_every_message() {
    init_tracing();
    let ctx = CallContext::new();
    let llm = Arc::new(ScriptedLlm::from_fn(|_| Ok("the story so far".to_string())));
    let mut memory = SummaryMemory::new(llm.clone(), 10).with_tokenizer(WhitespaceTokenizer);

    let mut put = Vec::new();
    for i in 0..8 {
        let message = if i % 2 == 0 {
            ChatMessage::user(words(4, &format!("m{i}_")))
        } else {
            ChatMessage::assistant(words(4, &format!("m{i}_")))
        };
        put.push(message.clone());
        memory.put(message, &ctx).await.unwrap();

        let all = memory.get_all();
        let live: Vec<ChatMessage> = all.iter().filter(|m| !is_summary(m)).cloned().collect();
        assert_eq!(memory.subsumed_count() + live.len(), put.len());
        assert_eq!(live, put[memory.subsumed_count()..].to_vec());
        assert!(sizes(&all).iter().sum::<usize>() <= 10);
    }

    assert_eq!(memory.summary(), Some("the story so far"));
    assert!(llm.call_count() > 0);
    assert!(llm.prompts().iter().all(|p| p.starts_with("system: ")));
}

#[tokio::test]
async fn test_summary_memory_feeds_previous_summary_forward() {
    init_tracing();
    let ctx = CallContext::new();
    let llm = Arc::new(ScriptedLlm::new(["first summary", "second summary"]));
    let mut memory = SummaryMemory::new(llm.clone(), 6).with_tokenizer(WhitespaceTokenizer);

    memory.put(ChatMessage::user(words(4, "a")), &ctx).await.unwrap();
    memory.put(ChatMessage::assistant(words(4, "b")), &ctx).await.unwrap();
    memory.put(ChatMessage::user(words(4, "c")), &ctx).await.unwrap();

    assert_eq!(llm.call_count(), 2);
    assert!(llm.prompts()[1].contains("Previous summary: first summary"));
    assert_eq!(memory.summary(), Some("second summary"));
    assert_eq!(memory.subsumed_count(), 2);
}

async fn round_trip(mut memory: AnyMemory, ctx: &CallContext) {
    let before = memory.get_all();
    memory.set(before.clone(), ctx).await.unwrap();
    assert_eq!(memory.get_all(), before, "{} round trip", memory.name());
}

#[test_case("simple" ; "simple memory")]
#[test_case("token_buffer" ; "token buffer memory")]
#[test_case("summary" ; "summary memory")]
#[tokio::test]
async fn test_set_of_get_all_is_identity(variant: &str) {
    let ctx = CallContext::new();
    let llm = Arc::new(ScriptedLlm::default().with_fallback("condensed history"));
    let mut memory: AnyMemory = match variant {
        "simple" => SimpleMemory::new().into(),
        "token_buffer" => TokenBufferMemory::new(12)
            .with_tokenizer(WhitespaceTokenizer)
            .into(),
        _ => SummaryMemory::new(llm, 12)
            .with_tokenizer(WhitespaceTokenizer)
            .into(),
    };

    memory
        .put_messages(
            vec![
                ChatMessage::system("be brief"),
                ChatMessage::user(words(5, "q")),
                ChatMessage::assistant(words(5, "r")),
                ChatMessage::user(words(5, "s")),
            ],
            &ctx,
        )
        .await
        .unwrap();

    round_trip(memory, &ctx).await;
}

#[tokio::test]
async fn test_reset_clears_all_variants() {
    let ctx = CallContext::new();
    let llm = Arc::new(ScriptedLlm::default());
    let memories: Vec<AnyMemory> = vec![
        SimpleMemory::new().into(),
        TokenBufferMemory::new(100).into(),
        SummaryMemory::new(llm, 100).into(),
    ];

    for mut memory in memories {
        memory.put(ChatMessage::user("hello"), &ctx).await.unwrap();
        assert_eq!(memory.message_count(), 1);
        memory.reset();
        assert_eq!(memory.message_count(), 0, "{} not reset", memory.name());
    }
}

#[tokio::test]
async fn test_cancelled_put_leaves_memory_unchanged() {
    let ctx = CallContext::new();
    let mut memory = TokenBufferMemory::new(100);
    memory.put(ChatMessage::user("before"), &ctx).await.unwrap();

    let cancelled = CallContext::new();
    cancelled.cancel();
    let err = memory
        .put(ChatMessage::user("after"), &cancelled)
        .await
        .unwrap_err();
    assert!(matches!(err, RaglineError::Cancelled));
    assert_eq!(memory.get_all(), vec![ChatMessage::user("before")]);
}
