//! LLM-judged reranking.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use ragline_core::config::RerankConfig;
use ragline_core::{
    CallContext, Llm, MetadataMode, NodeWithScore, QueryBundle, RaglineError, Result,
    ensure_unique_ids, retry_once,
};
use regex::Regex;
use tracing::{debug, info, instrument, warn};

use super::{NodePostprocessor, require_query};

/// Default prompt asking the judge for `Doc: N, Relevance: X` lines.
pub const DEFAULT_CHOICE_SELECT_PROMPT: &str = "A list of documents is shown below. Each document has a number next to it along with a summary of the document. A question is also provided.
Respond with the numbers of the documents you should consult to answer the question, in order of relevance, as well as the relevance score. The relevance score is a number from 1-10 based on how relevant you think the document is to the question.
Do not include any documents that are not relevant to the question.
Example format:
Document 1:
<summary of document 1>

Document 2:
<summary of document 2>

...

Document 10:
<summary of document 10>

Question: <question>
Answer:
Doc: 9, Relevance: 7
Doc: 3, Relevance: 4
Doc: 7, Relevance: 3

Let's try this now:

{context_str}
Question: {query_str}
Answer:
";

static CHOICE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)doc(?:ument)?\s*[:#]?\s*(\d+)\s*[,;:]?\s*relevance\s*[:=]?\s*(-?\d+(?:\.\d+)?)")
        .expect("valid choice-select pattern")
});

/// Parse `Doc: N, Relevance: X` lines into 0-based `(index, score)` pairs.
///
/// Matching is case-insensitive and tolerant of surrounding prose. Indices
/// outside `1..=batch_len` are skipped, and the first score seen for an index
/// wins.
pub fn parse_choice_select_answer(answer: &str, batch_len: usize) -> Vec<(usize, f32)> {
    let mut seen = HashMap::new();
    let mut parsed = Vec::new();

    for line in answer.lines() {
        let Some(caps) = CHOICE_LINE.captures(line) else {
            if !line.trim().is_empty() {
                debug!(line, "skipping unparseable rerank line");
            }
            continue;
        };
        let (Ok(doc), Ok(score)) = (caps[1].parse::<usize>(), caps[2].parse::<f32>()) else {
            warn!(line, "skipping rerank line with malformed numbers");
            continue;
        };
        if doc == 0 || doc > batch_len {
            warn!(doc, batch_len, "skipping rerank line with out-of-batch index");
            continue;
        }
        if seen.insert(doc, score).is_none() {
            parsed.push((doc - 1, score));
        }
    }
    parsed
}

/// Reranks nodes by asking an LLM judge for relevance scores.
///
/// Nodes are split into batches of `batch_size` (all nodes by default). For
/// each batch the judge sees the nodes numbered from 1 and answers with
/// `Doc: N, Relevance: X` lines. Nodes the judge does not score receive 0.
/// All nodes are then sorted by descending judge score, ties broken by input
/// position, and the first `top_n` are returned with their scores replaced by
/// the judge scores.
///
/// A batch whose answer contains no parseable line fails with a parse error.
#[derive(Debug, Clone)]
pub struct LlmRerank {
    llm: Arc<dyn Llm>,
    top_n: usize,
    batch_size: Option<usize>,
    prompt_template: String,
}

impl LlmRerank {
    /// Create a reranker keeping `top_n` nodes.
    pub fn new(llm: Arc<dyn Llm>, top_n: usize) -> Self {
        Self {
            llm,
            top_n,
            batch_size: None,
            prompt_template: DEFAULT_CHOICE_SELECT_PROMPT.to_string(),
        }
    }

    /// Create a reranker from configuration.
    pub fn from_config(llm: Arc<dyn Llm>, config: &RerankConfig) -> Result<Self> {
        config.validate()?;
        let mut rerank = Self::new(llm, config.top_n);
        rerank.batch_size = config.batch_size;
        if let Some(template) = &config.prompt_template {
            rerank.prompt_template.clone_from(template);
        }
        Ok(rerank)
    }

    /// Set the number of nodes per judge call.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size.max(1));
        self
    }

    /// Override the prompt; it must contain `{context_str}` and `{query_str}`.
    #[must_use]
    pub fn with_prompt_template<S: Into<String>>(mut self, template: S) -> Self {
        self.prompt_template = template.into();
        self
    }

    /// Number of nodes kept.
    pub fn top_n(&self) -> usize {
        self.top_n
    }

    fn render(&self, batch: &[NodeWithScore], query: &str) -> String {
        let context_str = batch
            .iter()
            .enumerate()
            .map(|(i, scored)| {
                format!(
                    "Document {}:\n{}\n",
                    i + 1,
                    scored.node.get_content(MetadataMode::Llm)
                )
            })
            .collect::<Vec<_>>()
            .join("\n");
        self.prompt_template
            .replace("{context_str}", &context_str)
            .replace("{query_str}", query)
    }

    async fn score_batch(
        &self,
        batch: &[NodeWithScore],
        query: &str,
        ctx: &CallContext,
    ) -> Result<Vec<(usize, f32)>> {
        let prompt = self.render(batch, query);
        let answer = retry_once(ctx, "llm rerank", || self.llm.complete(&prompt, ctx)).await?;

        let parsed = parse_choice_select_answer(&answer, batch.len());
        if parsed.is_empty() {
            return Err(RaglineError::parse(format!(
                "rerank answer contains no 'Doc: N, Relevance: X' line: {}",
                answer.trim()
            )));
        }
        Ok(parsed)
    }
}

#[async_trait]
impl NodePostprocessor for LlmRerank {
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

        let batch_size = self.batch_size.unwrap_or(nodes.len()).max(1);
        let mut judged = vec![0.0_f32; nodes.len()];

        for (batch_index, batch) in nodes.chunks(batch_size).enumerate() {
            let offset = batch_index * batch_size;
            for (i, score) in self.score_batch(batch, query, ctx).await? {
                judged[offset + i] = score;
            }
            debug!(batch = batch_index, size = batch.len(), "scored rerank batch");
        }

        let mut ranked: Vec<(usize, NodeWithScore)> = nodes.into_iter().enumerate().collect();
        ranked.sort_by(|(ia, _), (ib, _)| judged[*ib].total_cmp(&judged[*ia]).then(ia.cmp(ib)));

        let out: Vec<NodeWithScore> = ranked
            .into_iter()
            .take(self.top_n)
            .map(|(i, mut scored)| {
                scored.score = judged[i];
                scored
            })
            .collect();

        info!(returned = out.len(), "LLM rerank completed");
        Ok(out)
    }

    fn name(&self) -> &'static str {
        "LlmRerank"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use ragline_core::TextNode;
    use ragline_core::testing::ScriptedLlm;

    fn nodes(n: usize) -> Vec<NodeWithScore> {
        (1..=n)
            .map(|i| NodeWithScore::new(TextNode::with_id(format!("n{i}"), format!("text {i}")), 0.5))
            .collect()
    }

    #[test]
    fn test_parse_is_lenient() {
        let answer = "Sure! Here you go:\ndoc: 2, relevance: 8.5\nDOCUMENT 1 relevance 3\nDoc: 2, Relevance: 1\nDoc: 7, Relevance: 9\nnothing here";
        assert_eq!(parse_choice_select_answer(answer, 3), vec![(1, 8.5), (0, 3.0)]);
    }

    #[tokio::test]
    async fn test_batches_offset_indices() {
        let llm = Arc::new(ScriptedLlm::new([
            "Doc: 2, Relevance: 4",
            "Doc: 1, Relevance: 9\nDoc: 2, Relevance: 6",
        ]));
        let rerank = LlmRerank::new(llm.clone(), 4).with_batch_size(2);
        let out = rerank
            .postprocess_nodes(nodes(4), Some(&QueryBundle::new("q")), &CallContext::new())
            .await
            .unwrap();

        let ids: Vec<&str> = out.iter().map(NodeWithScore::id).collect();
        assert_eq!(ids, vec!["n3", "n4", "n2", "n1"]);
        let scores: Vec<f32> = out.iter().map(|n| n.score).collect();
        assert_eq!(scores, vec![9.0, 6.0, 4.0, 0.0]);
        assert_eq!(llm.call_count(), 2);
        assert!(llm.prompts()[1].contains("Document 1:\ntext 3"));
    }

    #[tokio::test]
    async fn test_missing_query_is_validation_error() {
        let llm = Arc::new(ScriptedLlm::default());
        let err = LlmRerank::new(llm, 2)
            .postprocess_nodes(nodes(2), None, &CallContext::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RaglineError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_unparseable_answer_is_parse_error() {
        let llm = Arc::new(ScriptedLlm::new(["I cannot rank these."]));
        let err = LlmRerank::new(llm, 2)
            .postprocess_nodes(nodes(2), Some(&QueryBundle::new("q")), &CallContext::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RaglineError::Parse { .. }));
    }

    #[tokio::test]
    async fn test_empty_input_makes_no_call() {
        let llm = Arc::new(ScriptedLlm::default());
        let out = LlmRerank::new(llm.clone(), 2)
            .postprocess_nodes(Vec::new(), Some(&QueryBundle::new("q")), &CallContext::new())
            .await
            .unwrap();
        assert!(out.is_empty());
        assert_eq!(llm.call_count(), 0);
    }
}
