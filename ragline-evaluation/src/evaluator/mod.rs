//! Response evaluators.
//!
//! Judge-style evaluators ask an LLM for a verdict and parse it leniently;
//! [`SemanticSimilarity`] compares embeddings instead. All of them share the
//! [`Evaluator`] interface and check their required input fields first.

use std::sync::Arc;

use async_trait::async_trait;
use ragline_core::{CallContext, Llm, Result, retry_once};

use crate::{EvalField, EvalInput, EvalResult};

pub mod context_relevancy;
pub mod correctness;
pub mod faithfulness;
pub mod relevancy;
pub mod semantic_similarity;

pub use context_relevancy::*;
pub use correctness::*;
pub use faithfulness::*;
pub use relevancy::*;
pub use semantic_similarity::*;

/// Core trait for response evaluation.
#[async_trait]
pub trait Evaluator: Send + Sync + std::fmt::Debug {
    /// Evaluate one input.
    ///
    /// # Errors
    ///
    /// Returns a validation error when a required field is missing, a parse
    /// error when the judge's answer holds no verdict, and provider,
    /// transport, or cancellation errors from collaborators.
    async fn evaluate(&self, input: &EvalInput, ctx: &CallContext) -> Result<EvalResult>;

    /// Fields this evaluator requires.
    fn required_fields(&self) -> &'static [EvalField];

    /// Get the name of this evaluator for logging/debugging.
    fn name(&self) -> &'static str;
}

/// Closed set of evaluators with static dispatch.
#[derive(Debug)]
pub enum AnyEvaluator {
    /// Response grounded in contexts.
    Faithfulness(Faithfulness),
    /// Response answers the query from contexts.
    Relevancy(Relevancy),
    /// Response rated against a reference.
    Correctness(Correctness),
    /// Contexts relevant to the query.
    ContextRelevancy(ContextRelevancy),
    /// Embedding similarity to a reference.
    SemanticSimilarity(SemanticSimilarity),
}

#[async_trait]
impl Evaluator for AnyEvaluator {
    async fn evaluate(&self, input: &EvalInput, ctx: &CallContext) -> Result<EvalResult> {
        match self {
            Self::Faithfulness(e) => e.evaluate(input, ctx).await,
            Self::Relevancy(e) => e.evaluate(input, ctx).await,
            Self::Correctness(e) => e.evaluate(input, ctx).await,
            Self::ContextRelevancy(e) => e.evaluate(input, ctx).await,
            Self::SemanticSimilarity(e) => e.evaluate(input, ctx).await,
        }
    }

    fn required_fields(&self) -> &'static [EvalField] {
        match self {
            Self::Faithfulness(e) => e.required_fields(),
            Self::Relevancy(e) => e.required_fields(),
            Self::Correctness(e) => e.required_fields(),
            Self::ContextRelevancy(e) => e.required_fields(),
            Self::SemanticSimilarity(e) => e.required_fields(),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Faithfulness(e) => e.name(),
            Self::Relevancy(e) => e.name(),
            Self::Correctness(e) => e.name(),
            Self::ContextRelevancy(e) => e.name(),
            Self::SemanticSimilarity(e) => e.name(),
        }
    }
}

macro_rules! impl_from_evaluator {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for AnyEvaluator {
                fn from(e: $variant) -> Self {
                    Self::$variant(e)
                }
            }
        )*
    };
}

impl_from_evaluator!(
    Faithfulness,
    Relevancy,
    Correctness,
    ContextRelevancy,
    SemanticSimilarity,
);

/// An LLM judge with a prompt template.
///
/// Placeholders `{query_str}`, `{response_str}`, `{context_str}` and
/// `{reference_str}` are substituted when present.
#[derive(Debug, Clone)]
pub(crate) struct Judge {
    llm: Arc<dyn Llm>,
    template: String,
}

impl Judge {
    pub(crate) fn new(llm: Arc<dyn Llm>, template: &str) -> Self {
        Self {
            llm,
            template: template.to_string(),
        }
    }

    pub(crate) fn set_template(&mut self, template: String) {
        self.template = template;
    }

    pub(crate) fn render(&self, vars: &[(&str, &str)]) -> String {
        vars.iter().fold(self.template.clone(), |prompt, (key, value)| {
            prompt.replace(&format!("{{{key}}}"), value)
        })
    }

    pub(crate) async fn ask(
        &self,
        operation: &str,
        vars: &[(&str, &str)],
        ctx: &CallContext,
    ) -> Result<String> {
        let prompt = self.render(vars);
        retry_once(ctx, operation, || self.llm.complete(&prompt, ctx)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragline_core::testing::ScriptedLlm;

    #[test]
    fn test_judge_render() {
        let judge = Judge::new(
            Arc::new(ScriptedLlm::default()),
            "Q: {query_str}\nA: {response_str}\nunused: {reference_str}",
        );
        assert_eq!(
            judge.render(&[("query_str", "why?"), ("response_str", "because")]),
            "Q: why?\nA: because\nunused: {reference_str}"
        );
    }

    #[test]
    fn test_dispatch_names() {
        let llm: Arc<dyn Llm> = Arc::new(ScriptedLlm::default());
        let evaluators: Vec<AnyEvaluator> = vec![
            Faithfulness::new(llm.clone()).into(),
            Relevancy::new(llm.clone()).into(),
            Correctness::new(llm.clone()).into(),
            ContextRelevancy::new(llm).into(),
        ];
        let names: Vec<&str> = evaluators.iter().map(Evaluator::name).collect();
        assert_eq!(
            names,
            vec!["Faithfulness", "Relevancy", "Correctness", "ContextRelevancy"]
        );
        assert_eq!(
            evaluators[2].required_fields(),
            &[EvalField::Query, EvalField::Response, EvalField::Reference]
        );
    }
}
