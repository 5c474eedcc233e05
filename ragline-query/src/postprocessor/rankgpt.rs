//! Permutation reranking in the RankGPT style.

use std::collections::HashSet;
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use ragline_core::{
    CallContext, ChatMessage, Llm, MetadataMode, NodeWithScore, QueryBundle, RaglineError, Result,
    ensure_unique_ids, retry_once,
};
use regex::Regex;
use tracing::{debug, info, instrument};

use super::{NodePostprocessor, require_query};

const RANKGPT_SYSTEM_PROMPT: &str = "You are RankGPT, an intelligent assistant that can rank passages based on their relevancy to the query.";

static LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("valid label pattern"));

/// Turn a ranking answer such as `[2] > [3] > [1]` into 0-based indices.
///
/// Labels outside `1..=n` are ignored, duplicates keep their first
/// occurrence, and labels the judge left out are appended in input order.
/// Returns `None` when the answer holds no label at all.
pub fn parse_permutation(answer: &str, n: usize) -> Option<Vec<usize>> {
    let mut seen = HashSet::with_capacity(n);
    let mut order = Vec::with_capacity(n);
    let mut any_label = false;

    for m in LABEL.find_iter(answer) {
        let Ok(label) = m.as_str().parse::<usize>() else {
            continue;
        };
        any_label = true;
        if (1..=n).contains(&label) && seen.insert(label - 1) {
            order.push(label - 1);
        }
    }

    if !any_label {
        return None;
    }
    order.extend((0..n).filter(|i| !seen.contains(i)));
    Some(order)
}

/// Reranks by asking the LLM for a permutation of all nodes.
///
/// The judge sees the nodes labelled `[1]..[n]` in a chat transcript and
/// answers with a ranked listing. Scores are left as they were on input;
/// only the order changes. The first `top_n` nodes are returned.
#[derive(Debug, Clone)]
pub struct RankGptRerank {
    llm: Arc<dyn Llm>,
    top_n: usize,
    verbose: bool,
}

impl RankGptRerank {
    /// Create a reranker keeping `top_n` nodes.
    pub fn new(llm: Arc<dyn Llm>, top_n: usize) -> Self {
        Self {
            llm,
            top_n,
            verbose: false,
        }
    }

    /// Log the judge's permutation at info level.
    #[must_use]
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    fn messages(nodes: &[NodeWithScore], query: &str) -> Vec<ChatMessage> {
        let n = nodes.len();
        let mut messages = vec![
            ChatMessage::system(RANKGPT_SYSTEM_PROMPT),
            ChatMessage::user(format!(
                "I will provide you with {n} passages, each indicated by number identifier []. \nRank the passages based on their relevance to query: {query}."
            )),
            ChatMessage::assistant("Okay, please provide the passages."),
        ];
        for (i, scored) in nodes.iter().enumerate() {
            let label = i + 1;
            let content = scored.node.get_content(MetadataMode::Llm);
            messages.push(ChatMessage::user(format!("[{label}] {}", content.trim())));
            messages.push(ChatMessage::assistant(format!("Received passage [{label}].")));
        }
        messages.push(ChatMessage::user(format!(
            "Search Query: {query}. \nRank the {n} passages above based on their relevance to the search query. The passages should be listed in descending order using identifiers. The most relevant passages should be listed first. The output format should be [] > [], e.g., [1] > [2]. Only response the ranking results, do not say any word or explain."
        )));
        messages
    }
}

#[async_trait]
impl NodePostprocessor for RankGptRerank {
    #[instrument(skip(self, nodes, query, ctx), fields(nodes = nodes.len(), top_n = self.top_n))]
    async fn postprocess_nodes(
        &self,
        nodes: Vec<NodeWithScore>,
        query: Option<&QueryBundle>,
        ctx: &CallContext,
    ) -> Result<Vec<NodeWithScore>> {
        let query = require_query(query, self.name())?;
        ensure_unique_ids(&nodes)?;
        if nodes.is_empty() {
            return Ok(nodes);
        }

        let messages = Self::messages(&nodes, query);
        let answer = retry_once(ctx, "rankgpt rerank", || self.llm.chat(&messages, ctx)).await?;

        let permutation = parse_permutation(&answer, nodes.len()).ok_or_else(|| {
            RaglineError::parse(format!(
                "ranking answer contains no passage label: {}",
                answer.trim()
            ))
        })?;

        if self.verbose {
            info!(answer = %answer.trim(), ?permutation, "RankGPT permutation");
        } else {
            debug!(?permutation, "RankGPT permutation");
        }

        let mut slots: Vec<Option<NodeWithScore>> = nodes.into_iter().map(Some).collect();
        Ok(permutation
            .into_iter()
            .filter_map(|i| slots[i].take())
            .take(self.top_n)
            .collect())
    }

    fn name(&self) -> &'static str {
        "RankGptRerank"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use ragline_core::TextNode;
    use ragline_core::testing::ScriptedLlm;
    use test_case::test_case;

    #[test_case("[2] > [3] > [1]", 3, vec![1, 2, 0] ; "full permutation")]
    #[test_case("[3] > [1]", 4, vec![2, 0, 1, 3] ; "missing labels appended")]
    #[test_case("[2] > [2] > [1] > [9]", 3, vec![1, 0, 2] ; "duplicates and out of range")]
    #[test_case("Ranking: 4 > 1", 4, vec![3, 0, 1, 2] ; "bare numbers")]
    fn test_parse_permutation(answer: &str, n: usize, expected: Vec<usize>) {
        assert_eq!(parse_permutation(answer, n), Some(expected));
    }

    #[test]
    fn test_parse_permutation_without_labels() {
        assert_eq!(parse_permutation("I don't know", 3), None);
    }

    #[tokio::test]
    async fn test_scores_preserved_and_top_n_applied() {
        let nodes = vec![
            NodeWithScore::new(TextNode::with_id("a", "alpha"), 0.9),
            NodeWithScore::new(TextNode::with_id("b", "beta"), 0.8),
            NodeWithScore::new(TextNode::with_id("c", "gamma"), 0.7),
        ];
        let llm = Arc::new(ScriptedLlm::new(["[3] > [1] > [2]"]));
        let out = RankGptRerank::new(llm.clone(), 2)
            .postprocess_nodes(nodes, Some(&QueryBundle::new("greek")), &CallContext::new())
            .await
            .unwrap();

        let got: Vec<(&str, f32)> = out.iter().map(|n| (n.id(), n.score)).collect();
        assert_eq!(got, vec![("c", 0.7), ("a", 0.9)]);
        assert!(llm.prompts()[0].contains("user: [2] beta"));
    }

    #[tokio::test]
    async fn test_answer_without_labels_is_parse_error() {
        let nodes = vec![NodeWithScore::new(TextNode::with_id("a", "alpha"), 0.9)];
        let llm = Arc::new(ScriptedLlm::new(["no idea"]));
        let err = RankGptRerank::new(llm, 1)
            .postprocess_nodes(nodes, Some(&QueryBundle::new("q")), &CallContext::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RaglineError::Parse { .. }));
    }
}
