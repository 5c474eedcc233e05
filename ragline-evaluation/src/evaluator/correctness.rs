//! Correctness: how well does the response match a reference answer?

use std::sync::Arc;

use async_trait::async_trait;
use ragline_core::config::EvaluationConfig;
use ragline_core::{CallContext, Llm, Result};
use tracing::{debug, instrument};

use super::{Evaluator, Judge};
use crate::parsing::parse_rating;
use crate::{EvalField, EvalInput, EvalResult};

/// Default correctness prompt.
pub const DEFAULT_CORRECTNESS_PROMPT: &str = "You are an expert evaluation system for a question answering chatbot.
You are given a user query, a reference answer, and a generated answer.
Judge the relevance and correctness of the generated answer against the reference answer.
Output a single score between 1 and 5 on the first line, where 1 is completely wrong and 5 is fully correct.
On the next line give a one-line justification for the score.

User Query:
{query_str}

Reference Answer:
{reference_str}

Generated Answer:
{response_str}
";

const REQUIRED: &[EvalField] = &[EvalField::Query, EvalField::Response, EvalField::Reference];

/// Lowest rating the judge may give.
pub const MIN_RATING: f64 = 1.0;

/// Highest rating the judge may give.
pub const MAX_RATING: f64 = 5.0;

/// Rates a response against a reference answer on a 1 to 5 scale.
///
/// The score is the first rating in range on the judge's first line, or
/// anywhere in the answer when that line has none. Scale descriptions such
/// as "1 to 5" are not ratings. The default threshold is 4.0.
#[derive(Debug, Clone)]
pub struct Correctness {
    judge: Judge,
    threshold: f64,
}

impl Correctness {
    /// Create an evaluator with the default prompt.
    pub fn new(llm: Arc<dyn Llm>) -> Self {
        Self {
            judge: Judge::new(llm, DEFAULT_CORRECTNESS_PROMPT),
            threshold: 4.0,
        }
    }

    /// Create an evaluator from configuration.
    pub fn from_config(llm: Arc<dyn Llm>, config: &EvaluationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(llm).with_threshold(config.correctness_threshold))
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
impl Evaluator for Correctness {
    #[instrument(skip(self, input, ctx))]
    async fn evaluate(&self, input: &EvalInput, ctx: &CallContext) -> Result<EvalResult> {
        input.require(REQUIRED)?;
        let query = input.text(EvalField::Query)?;
        let response = input.text(EvalField::Response)?;
        let reference = input.text(EvalField::Reference)?;

        let answer = self
            .judge
            .ask(
                "correctness judge",
                &[
                    ("query_str", query),
                    ("response_str", response),
                    ("reference_str", reference),
                ],
                ctx,
            )
            .await?;
        let score = parse_rating(&answer, MIN_RATING, MAX_RATING)?;
        debug!(score, "correctness rating");

        Ok(EvalResult::new(score, self.threshold, answer).with_input(input))
    }

    fn required_fields(&self) -> &'static [EvalField] {
        REQUIRED
    }

    fn name(&self) -> &'static str {
        "Correctness"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ragline_core::RaglineError;
    use ragline_core::testing::ScriptedLlm;
    use test_case::test_case;

    fn input() -> EvalInput {
        EvalInput::new()
            .with_query("When was the Eiffel Tower completed?")
            .with_response("It was completed in 1889.")
            .with_reference("The Eiffel Tower was completed in March 1889.")
    }

    #[test_case("5\nMatches the reference.", 5.0, true ; "top rating")]
    #[test_case("Score: 4.0\nMinor omission.", 4.0, true ; "at threshold")]
    #[test_case("2\nWrong year.", 2.0, false ; "low rating")]
    #[tokio::test]
    async fn test_rating_drives_passing(answer: &str, score: f64, passing: bool) {
        let llm = Arc::new(ScriptedLlm::new([answer]));
        let result = Correctness::new(llm)
            .evaluate(&input(), &CallContext::new())
            .await
            .unwrap();
        assert_relative_eq!(result.score, score);
        assert_eq!(result.passing, passing);
    }

    #[tokio::test]
    async fn test_scale_phrase_is_not_the_rating() {
        let llm = Arc::new(ScriptedLlm::new([
            "On a scale of 1 to 5, I rate this answer 4.\nMatches the reference.",
        ]));
        let result = Correctness::new(llm)
            .evaluate(&input(), &CallContext::new())
            .await
            .unwrap();
        assert_relative_eq!(result.score, 4.0);
        assert!(result.passing);
    }

    #[tokio::test]
    async fn test_out_of_range_rating_is_parse_error() {
        let llm = Arc::new(ScriptedLlm::new(["9 out of 10"]));
        let err = Correctness::new(llm)
            .evaluate(&input(), &CallContext::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RaglineError::Parse { .. }));
    }
}
