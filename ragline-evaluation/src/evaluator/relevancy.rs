//! Relevancy: does the response answer the query from the contexts?

use std::sync::Arc;

use async_trait::async_trait;
use ragline_core::config::EvaluationConfig;
use ragline_core::{CallContext, Llm, Result};
use tracing::{debug, instrument};

use super::{Evaluator, Judge};
use crate::parsing::parse_yes_no;
use crate::{EvalField, EvalInput, EvalResult};

/// Default relevancy prompt.
pub const DEFAULT_RELEVANCY_PROMPT: &str = "Your task is to evaluate if the response for the query is in line with the context information provided.
You have two options to answer. Either YES or NO, on the first line, followed by a one-line explanation.
Answer YES if the response addresses the query and is in line with the context information, otherwise NO.

Query: {query_str}
Response: {response_str}
Context:
{context_str}
Answer: ";

const REQUIRED: &[EvalField] = &[EvalField::Query, EvalField::Response, EvalField::Contexts];

/// Judges whether a response addresses the query and is grounded in the
/// contexts. Score is 1.0 for YES, 0.0 for NO.
#[derive(Debug, Clone)]
pub struct Relevancy {
    judge: Judge,
    threshold: f64,
}

impl Relevancy {
    /// Create an evaluator with the default prompt.
    pub fn new(llm: Arc<dyn Llm>) -> Self {
        Self {
            judge: Judge::new(llm, DEFAULT_RELEVANCY_PROMPT),
            threshold: 0.5,
        }
    }

    /// Create an evaluator from configuration.
    pub fn from_config(llm: Arc<dyn Llm>, config: &EvaluationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(llm).with_threshold(config.relevancy_threshold))
    }

    /// Override the passing threshold.
    #[must_use]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Override the prompt.
    #[must_use]
    pub fn with_prompt_template<S: Into<String>>(mut self, template: S) -> Self {
        self.judge.set_template(template.into());
        self
    }
}

#[async_trait]
impl Evaluator for Relevancy {
    #[instrument(skip(self, input, ctx))]
    async fn evaluate(&self, input: &EvalInput, ctx: &CallContext) -> Result<EvalResult> {
        input.require(REQUIRED)?;
        let query = input.text(EvalField::Query)?;
        let response = input.text(EvalField::Response)?;
        let context_str = input.context_list()?.join("\n\n");

        let answer = self
            .judge
            .ask(
                "relevancy judge",
                &[
                    ("query_str", query),
                    ("response_str", response),
                    ("context_str", &context_str),
                ],
                ctx,
            )
            .await?;
        let relevant = parse_yes_no(&answer)?;
        debug!(relevant, "relevancy verdict");

        let score = if relevant { 1.0 } else { 0.0 };
        Ok(EvalResult::new(score, self.threshold, answer).with_input(input))
    }

    fn required_fields(&self) -> &'static [EvalField] {
        REQUIRED
    }

    fn name(&self) -> &'static str {
        "Relevancy"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragline_core::RaglineError;
    use ragline_core::testing::ScriptedLlm;

    fn input() -> EvalInput {
        EvalInput::new()
            .with_query("What is LlamaIndex?")
            .with_response("LlamaIndex is a data framework for LLM applications.")
            .with_contexts(["LlamaIndex is a data framework for LLM applications."])
    }

    #[tokio::test]
    async fn test_relevant_response_passes() {
        let llm = Arc::new(ScriptedLlm::new(["Yes, it answers the question directly."]));
        let result = Relevancy::new(llm)
            .evaluate(&input(), &CallContext::new())
            .await
            .unwrap();
        assert!(result.passing);
        assert_eq!(result.query.as_deref(), Some("What is LlamaIndex?"));
    }

    #[tokio::test]
    async fn test_answer_without_verdict_is_parse_error() {
        let llm = Arc::new(ScriptedLlm::new(["It depends."]));
        let err = Relevancy::new(llm)
            .evaluate(&input(), &CallContext::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RaglineError::Parse { .. }));
    }

    #[tokio::test]
    async fn test_transport_error_retried_once() {
        let llm = Arc::new(
            ScriptedLlm::default()
                .then_error(RaglineError::transport("connection reset"))
                .then_respond("NO\nOff topic."),
        );
        let result = Relevancy::new(llm.clone())
            .evaluate(&input(), &CallContext::new())
            .await
            .unwrap();
        assert!(!result.passing);
        assert_eq!(llm.call_count(), 2);
    }
}
