//! Evaluation results and batch summaries.

use ragline_core::RaglineError;
use serde::Serialize;

use crate::EvalInput;

/// The verdict of one evaluation.
///
/// `passing` is fixed when the result is built from its score and threshold
/// and is never recomputed. A failed evaluation carries a NaN score, which
/// never passes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvalResult {
    /// Query the result refers to, if the input had one.
    pub query: Option<String>,
    /// Response the result refers to, if the input had one.
    pub response: Option<String>,
    /// Whether the score met the threshold.
    pub passing: bool,
    /// Evaluator score; NaN for a failed evaluation.
    pub score: f64,
    /// Trimmed judge rationale, or the error text of a failed evaluation.
    pub feedback: String,
    /// Which side won a pairwise comparison, when applicable.
    pub pairwise_source: Option<String>,
}

impl EvalResult {
    /// Build a result; `passing` is `score >= threshold`.
    pub fn new<S: Into<String>>(score: f64, threshold: f64, feedback: S) -> Self {
        Self {
            query: None,
            response: None,
            passing: score >= threshold,
            score,
            feedback: feedback.into().trim().to_string(),
            pairwise_source: None,
        }
    }

    /// A non-passing result recording `error` as feedback.
    pub fn failed(error: &RaglineError, input: &EvalInput) -> Self {
        Self {
            passing: false,
            ..Self::new(f64::NAN, 0.0, error.to_string())
        }
        .with_input(input)
    }

    /// Copy the query and response from `input`.
    #[must_use]
    pub fn with_input(mut self, input: &EvalInput) -> Self {
        self.query.clone_from(&input.query);
        self.response.clone_from(&input.response);
        self
    }

    /// Record the pairwise source.
    #[must_use]
    pub fn with_pairwise_source<S: Into<String>>(mut self, source: S) -> Self {
        self.pairwise_source = Some(source.into());
        self
    }

    /// Whether this result records an error instead of a score.
    pub fn is_failed(&self) -> bool {
        self.score.is_nan()
    }
}

/// Aggregate statistics over a batch of results.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BatchSummary {
    /// Number of results.
    pub total: usize,
    /// Number of passing results.
    pub passing: usize,
    /// Number of failed evaluations.
    pub failed: usize,
    /// `passing / total`, or 0 for an empty batch.
    pub pass_rate: f64,
    /// Mean over finite scores, if any.
    pub mean_score: Option<f64>,
}

impl BatchSummary {
    /// Summarize `results`.
    #[allow(clippy::cast_precision_loss)]
    pub fn from_results(results: &[EvalResult]) -> Self {
        let total = results.len();
        let passing = results.iter().filter(|r| r.passing).count();
        let failed = results.iter().filter(|r| r.is_failed()).count();

        let finite: Vec<f64> = results
            .iter()
            .map(|r| r.score)
            .filter(|s| s.is_finite())
            .collect();
        let mean_score =
            (!finite.is_empty()).then(|| finite.iter().sum::<f64>() / finite.len() as f64);

        Self {
            total,
            passing,
            failed,
            pass_rate: if total == 0 {
                0.0
            } else {
                passing as f64 / total as f64
            },
            mean_score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_passing_fixed_at_construction() {
        assert!(EvalResult::new(4.0, 4.0, "ok").passing);
        assert!(!EvalResult::new(3.0, 4.0, "low").passing);
        assert!(!EvalResult::new(f64::NAN, f64::NEG_INFINITY, "nan").passing);
    }

    #[test]
    fn test_failed_result() {
        let input = EvalInput::new().with_query("q");
        let result = EvalResult::failed(&RaglineError::parse("no verdict"), &input);
        assert!(result.is_failed());
        assert!(!result.passing);
        assert_eq!(result.query.as_deref(), Some("q"));
        assert!(result.feedback.contains("no verdict"));
    }

    #[test]
    fn test_failed_result_serializes_score_as_null() {
        let result = EvalResult::failed(&RaglineError::Cancelled, &EvalInput::new());
        let json = serde_json::to_value(&result).unwrap();
        assert!(json["score"].is_null());
    }

    #[test]
    fn test_summary() {
        let results = vec![
            EvalResult::new(1.0, 0.5, "yes"),
            EvalResult::new(0.0, 0.5, "no"),
            EvalResult::failed(&RaglineError::transport("reset"), &EvalInput::new()),
            EvalResult::new(1.0, 0.5, "yes"),
        ];
        let summary = BatchSummary::from_results(&results);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.passing, 2);
        assert_eq!(summary.failed, 1);
        assert_relative_eq!(summary.pass_rate, 0.5);
        assert_relative_eq!(summary.mean_score.unwrap(), 2.0 / 3.0);
    }
}
