//! Faithfulness: is every claim in the response supported by the contexts?

use std::sync::Arc;

use async_trait::async_trait;
use ragline_core::config::EvaluationConfig;
use ragline_core::{CallContext, Llm, Result};
use tracing::{debug, instrument};

use super::{Evaluator, Judge};
use crate::parsing::parse_yes_no;
use crate::{EvalField, EvalInput, EvalResult};

/// Default faithfulness prompt.
pub const DEFAULT_FAITHFULNESS_PROMPT: &str = "Please tell if a given piece of information is supported by the context.
You need to answer with either YES or NO on the first line, followed by a one-line explanation.
Answer YES only if every factual claim in the information is supported by the context, even if most of the context is unrelated.
Answer NO if any claim is missing from or contradicted by the context.

Information: {response_str}
Context:
{context_str}
Answer: ";

const REQUIRED: &[EvalField] = &[EvalField::Response, EvalField::Contexts];

/// Judges whether a response is grounded in its contexts.
///
/// Score is 1.0 for a YES verdict and 0.0 for NO; the default threshold is
/// 0.5.
#[derive(Debug, Clone)]
pub struct Faithfulness {
    judge: Judge,
    threshold: f64,
}

impl Faithfulness {
    /// Create an evaluator with the default prompt.
    pub fn new(llm: Arc<dyn Llm>) -> Self {
        Self {
            judge: Judge::new(llm, DEFAULT_FAITHFULNESS_PROMPT),
            threshold: 0.5,
        }
    }

    /// Create an evaluator from configuration.
    pub fn from_config(llm: Arc<dyn Llm>, config: &EvaluationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(llm).with_threshold(config.faithfulness_threshold))
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
impl Evaluator for Faithfulness {
    #[instrument(skip(self, input, ctx))]
    async fn evaluate(&self, input: &EvalInput, ctx: &CallContext) -> Result<EvalResult> {
        input.require(REQUIRED)?;
        let response = input.text(EvalField::Response)?;
        let context_str = input.context_list()?.join("\n\n");

        let answer = self
            .judge
            .ask(
                "faithfulness judge",
                &[("response_str", response), ("context_str", &context_str)],
                ctx,
            )
            .await?;
        let supported = parse_yes_no(&answer)?;
        debug!(supported, "faithfulness verdict");

        let score = if supported { 1.0 } else { 0.0 };
        Ok(EvalResult::new(score, self.threshold, answer).with_input(input))
    }

    fn required_fields(&self) -> &'static [EvalField] {
        REQUIRED
    }

    fn name(&self) -> &'static str {
        "Faithfulness"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragline_core::RaglineError;
    use ragline_core::testing::ScriptedLlm;

    fn input() -> EvalInput {
        EvalInput::new()
            .with_response("LlamaIndex was founded in 2015 in San Francisco.")
            .with_context("LlamaIndex is a data framework for LLM applications.")
    }

    #[tokio::test]
    async fn test_unsupported_claim_fails() {
        let llm = Arc::new(ScriptedLlm::new([
            "NO\nThe context says nothing about when or where LlamaIndex was founded.",
        ]));
        let result = Faithfulness::new(llm.clone())
            .evaluate(&input(), &CallContext::new())
            .await
            .unwrap();

        assert_eq!(result.score, 0.0);
        assert!(!result.passing);
        assert!(result.feedback.starts_with("NO"));
        assert!(llm.prompts()[0].contains("Information: LlamaIndex was founded"));
    }

    #[tokio::test]
    async fn test_missing_contexts_is_validation_error() {
        let llm = Arc::new(ScriptedLlm::default());
        let err = Faithfulness::new(llm.clone())
            .evaluate(&EvalInput::new().with_response("r"), &CallContext::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RaglineError::Validation { .. }));
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_custom_prompt() {
        let llm = Arc::new(ScriptedLlm::new(["yes"]));
        let result = Faithfulness::new(llm.clone())
            .with_prompt_template("CHECK {response_str} AGAINST {context_str}")
            .evaluate(&input(), &CallContext::new())
            .await
            .unwrap();
        assert!(result.passing);
        assert!(llm.prompts()[0].starts_with("CHECK LlamaIndex was founded"));
    }
}
