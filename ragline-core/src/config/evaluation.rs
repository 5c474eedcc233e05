//! Configuration for evaluators and the batch runner.

use serde::{Deserialize, Serialize};

use crate::similarity::SimilarityMode;
use crate::{RaglineError, Result};

/// Thresholds and concurrency for the evaluation harness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Passing threshold for faithfulness (score is 0 or 1).
    pub faithfulness_threshold: f64,

    /// Passing threshold for relevancy (score is 0 or 1).
    pub relevancy_threshold: f64,

    /// Passing threshold for correctness (score is 1 to 5).
    pub correctness_threshold: f64,

    /// Passing threshold for context relevancy (fraction of relevant contexts).
    pub context_relevancy_threshold: f64,

    /// Passing threshold for semantic similarity. Negative values are
    /// expected in Euclidean mode.
    pub similarity_threshold: f64,

    /// Similarity mode for semantic similarity.
    pub similarity_mode: SimilarityMode,

    /// Maximum evaluations in flight in the batch runner.
    pub concurrency: usize,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            faithfulness_threshold: 0.5,
            relevancy_threshold: 0.5,
            correctness_threshold: 4.0,
            context_relevancy_threshold: 0.5,
            similarity_threshold: 0.8,
            similarity_mode: SimilarityMode::Cosine,
            concurrency: 4,
        }
    }
}

impl EvaluationConfig {
    /// Set the batch runner concurrency.
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Set the semantic similarity mode and threshold.
    #[must_use]
    pub fn with_similarity(mut self, mode: SimilarityMode, threshold: f64) -> Self {
        self.similarity_mode = mode;
        self.similarity_threshold = threshold;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(RaglineError::configuration(
                "Evaluation concurrency must be greater than 0",
            ));
        }

        let thresholds = [
            ("faithfulness_threshold", self.faithfulness_threshold),
            ("relevancy_threshold", self.relevancy_threshold),
            ("correctness_threshold", self.correctness_threshold),
            ("context_relevancy_threshold", self.context_relevancy_threshold),
            ("similarity_threshold", self.similarity_threshold),
        ];
        if let Some((name, _)) = thresholds.iter().find(|(_, value)| !value.is_finite()) {
            return Err(RaglineError::configuration(format!(
                "{name} must be a finite number"
            )));
        }

        if !(1.0..=5.0).contains(&self.correctness_threshold) {
            return Err(RaglineError::configuration(
                "correctness_threshold must be between 1.0 and 5.0",
            ));
        }
        Ok(())
    }
}
