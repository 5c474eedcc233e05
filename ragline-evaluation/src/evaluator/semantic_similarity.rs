//! Embedding similarity between a response and a reference answer.

use std::sync::Arc;

use async_trait::async_trait;
use ragline_core::config::EvaluationConfig;
use ragline_core::{CallContext, Embedder, RaglineError, Result, SimilarityMode, similarity::similarity};
use tracing::{debug, instrument};

use super::Evaluator;
use crate::{EvalField, EvalInput, EvalResult};

const REQUIRED: &[EvalField] = &[EvalField::Response, EvalField::Reference];

/// Scores a response by the similarity of its embedding to the reference's.
///
/// Euclidean mode scores the negative distance, so larger is better in every
/// mode and thresholds for it are usually negative. The default mode is
/// cosine with threshold 0.8.
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use ragline_core::{Embedder, SimilarityMode};
/// use ragline_evaluation::SemanticSimilarity;
///
/// # fn build(embedder: Arc<dyn Embedder>) {
/// let evaluator = SemanticSimilarity::new(embedder)
///     .with_mode(SimilarityMode::Euclidean)
///     .with_threshold(-1.0);
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct SemanticSimilarity {
    embedder: Arc<dyn Embedder>,
    mode: SimilarityMode,
    threshold: f64,
}

impl SemanticSimilarity {
    /// Create an evaluator using cosine similarity.
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            mode: SimilarityMode::Cosine,
            threshold: 0.8,
        }
    }

    /// Create an evaluator from configuration.
    pub fn from_config(embedder: Arc<dyn Embedder>, config: &EvaluationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(embedder)
            .with_mode(config.similarity_mode)
            .with_threshold(config.similarity_threshold))
    }

    /// Set the similarity mode.
    #[must_use]
    pub fn with_mode(mut self, mode: SimilarityMode) -> Self {
        self.mode = mode;
        self
    }

    /// Override the passing threshold.
    #[must_use]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }
}

#[async_trait]
impl Evaluator for SemanticSimilarity {
    #[instrument(skip(self, input, ctx), fields(mode = %self.mode))]
    async fn evaluate(&self, input: &EvalInput, ctx: &CallContext) -> Result<EvalResult> {
        input.require(REQUIRED)?;
        if self.embedder.dimension() == 0 {
            return Err(RaglineError::configuration(format!(
                "embedder {} reports zero dimensions",
                self.embedder.model_name()
            )));
        }
        let response = input.text(EvalField::Response)?;
        let reference = input.text(EvalField::Reference)?;

        let embeddings = self
            .embedder
            .get_text_embedding_batch(&[response, reference], ctx)
            .await?;
        let [response_vec, reference_vec] = embeddings.as_slice() else {
            return Err(RaglineError::provider(format!(
                "expected 2 embeddings, got {}",
                embeddings.len()
            )));
        };

        let score = similarity(response_vec, reference_vec, self.mode)?;
        debug!(score, "semantic similarity");

        let feedback = format!("{} similarity: {score:.4}", self.mode);
        Ok(EvalResult::new(score, self.threshold, feedback).with_input(input))
    }

    fn required_fields(&self) -> &'static [EvalField] {
        REQUIRED
    }

    fn name(&self) -> &'static str {
        "SemanticSimilarity"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ragline_core::testing::StaticEmbedder;

    fn input(response: &str, reference: &str) -> EvalInput {
        EvalInput::new()
            .with_response(response)
            .with_reference(reference)
    }

    #[tokio::test]
    async fn test_euclidean_scores_negative_distance() {
        let embedder = Arc::new(
            StaticEmbedder::new(2)
                .with("x", vec![1.0, 0.0])
                .with("same", vec![1.0, 0.0])
                .with("other", vec![0.0, 1.0]),
        );
        let evaluator = SemanticSimilarity::new(embedder)
            .with_mode(SimilarityMode::Euclidean)
            .with_threshold(-1.0);
        let ctx = CallContext::new();

        let identical = evaluator.evaluate(&input("x", "same"), &ctx).await.unwrap();
        assert_relative_eq!(identical.score, 0.0);
        assert!(identical.passing);

        let orthogonal = evaluator.evaluate(&input("x", "other"), &ctx).await.unwrap();
        assert_relative_eq!(orthogonal.score, -std::f64::consts::SQRT_2, epsilon = 1e-9);
        assert!(!orthogonal.passing);
    }

    #[tokio::test]
    async fn test_cosine_default() {
        let embedder = Arc::new(
            StaticEmbedder::new(2)
                .with("a", vec![1.0, 1.0])
                .with("b", vec![1.0, 0.9]),
        );
        let result = SemanticSimilarity::new(embedder)
            .evaluate(&input("a", "b"), &CallContext::new())
            .await
            .unwrap();
        assert!(result.score > 0.99);
        assert!(result.passing);
        assert!(result.feedback.starts_with("cosine similarity"));
    }

    #[tokio::test]
    async fn test_zero_dimension_is_configuration_error() {
        let embedder = Arc::new(StaticEmbedder::new(0));
        let err = SemanticSimilarity::new(embedder)
            .evaluate(&input("a", "b"), &CallContext::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RaglineError::Configuration { .. }));
    }
}
