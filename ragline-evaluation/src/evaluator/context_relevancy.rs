//! Context relevancy: what share of the retrieved contexts is relevant to the
//! query?

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::try_join_all;
use ragline_core::config::EvaluationConfig;
use ragline_core::{CallContext, Llm, Result};
use tracing::{debug, instrument};

use super::{Evaluator, Judge};
use crate::parsing::parse_yes_no;
use crate::{EvalField, EvalInput, EvalResult};

/// Default per-context relevancy prompt.
pub const DEFAULT_CONTEXT_RELEVANCY_PROMPT: &str = "Your task is to decide whether a retrieved context is relevant to a query.
Answer YES or NO on the first line, followed by a one-line explanation.
Answer YES if the context contains information that helps answer the query, otherwise NO.

Query: {query_str}
Context:
{context_str}
Answer: ";

const REQUIRED: &[EvalField] = &[EvalField::Query, EvalField::Contexts];

/// Asks the judge about each context separately; the score is the fraction
/// judged relevant. Default threshold 0.5.
///
/// Contexts are judged concurrently. Any failing judgement fails the whole
/// evaluation.
#[derive(Debug, Clone)]
pub struct ContextRelevancy {
    judge: Judge,
    threshold: f64,
}

impl ContextRelevancy {
    /// Create an evaluator with the default prompt.
    pub fn new(llm: Arc<dyn Llm>) -> Self {
        Self {
            judge: Judge::new(llm, DEFAULT_CONTEXT_RELEVANCY_PROMPT),
            threshold: 0.5,
        }
    }

    /// Create an evaluator from configuration.
    pub fn from_config(llm: Arc<dyn Llm>, config: &EvaluationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(llm).with_threshold(config.context_relevancy_threshold))
    }

    /// Override the passing threshold.
    #[must_use]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Override the per-context prompt.
    #[must_use]
    pub fn with_prompt_template<S: Into<String>>(mut self, template: S) -> Self {
        self.judge.set_template(template.into());
        self
    }

    async fn judge_context(
        &self,
        query: &str,
        context: &str,
        ctx: &CallContext,
    ) -> Result<(bool, String)> {
        let answer = self
            .judge
            .ask(
                "context relevancy judge",
                &[("query_str", query), ("context_str", context)],
                ctx,
            )
            .await?;
        Ok((parse_yes_no(&answer)?, answer.trim().to_string()))
    }
}

#[async_trait]
impl Evaluator for ContextRelevancy {
    #[instrument(skip(self, input, ctx))]
    async fn evaluate(&self, input: &EvalInput, ctx: &CallContext) -> Result<EvalResult> {
        input.require(REQUIRED)?;
        let query = input.text(EvalField::Query)?;
        let contexts = input.context_list()?;

        let verdicts = try_join_all(
            contexts
                .iter()
                .map(|context| self.judge_context(query, context, ctx)),
        )
        .await?;

        let relevant = verdicts.iter().filter(|(yes, _)| *yes).count();
        #[allow(clippy::cast_precision_loss)]
        let score = relevant as f64 / verdicts.len() as f64;
        debug!(relevant, total = verdicts.len(), "context relevancy verdicts");

        let feedback = verdicts
            .iter()
            .enumerate()
            .map(|(i, (_, answer))| format!("Context {}: {answer}", i + 1))
            .collect::<Vec<_>>()
            .join("\n");
        Ok(EvalResult::new(score, self.threshold, feedback).with_input(input))
    }

    fn required_fields(&self) -> &'static [EvalField] {
        REQUIRED
    }

    fn name(&self) -> &'static str {
        "ContextRelevancy"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ragline_core::RaglineError;
    use ragline_core::testing::ScriptedLlm;

    #[tokio::test]
    async fn test_score_is_fraction_of_relevant_contexts() {
        let llm = Arc::new(ScriptedLlm::from_fn(|prompt| {
            Ok(if prompt.contains("Paris") {
                "YES\nMentions the capital.".to_string()
            } else {
                "NO\nUnrelated.".to_string()
            })
        }));
        let input = EvalInput::new()
            .with_query("What is the capital of France?")
            .with_contexts([
                "Paris is the capital of France.",
                "Bananas are rich in potassium.",
                "France's capital, Paris, hosts the Louvre.",
                "The Nile is a river.",
            ]);

        let result = ContextRelevancy::new(llm.clone())
            .evaluate(&input, &CallContext::new())
            .await
            .unwrap();

        assert_relative_eq!(result.score, 0.5);
        assert!(result.passing);
        assert_eq!(llm.call_count(), 4);
        assert!(result.feedback.starts_with("Context 1: YES"));
        assert!(result.feedback.contains("Context 4: NO"));
    }

    #[tokio::test]
    async fn test_one_unparseable_verdict_fails_evaluation() {
        let llm = Arc::new(ScriptedLlm::from_fn(|prompt| {
            Ok(if prompt.contains("alpha") {
                "YES".to_string()
            } else {
                "unsure".to_string()
            })
        }));
        let input = EvalInput::new()
            .with_query("q")
            .with_contexts(["alpha", "beta"]);

        let err = ContextRelevancy::new(llm)
            .evaluate(&input, &CallContext::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RaglineError::Parse { .. }));
    }
}
