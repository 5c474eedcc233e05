//! Bounded-concurrency batch evaluation.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::{StreamExt, stream};
use ragline_core::config::EvaluationConfig;
use ragline_core::{CallContext, Result};
use tracing::{info, instrument, warn};

use crate::{BatchSummary, EvalInput, EvalResult, Evaluator};

/// Runs evaluators over many inputs with at most `concurrency` evaluations
/// in flight.
///
/// Results come back in input order whatever the completion order. An error
/// on one input becomes a failed [`EvalResult`] for that input and does not
/// affect its peers. Only cancellation or the deadline of the batch context
/// aborts the whole batch.
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use ragline_core::{CallContext, Llm};
/// use ragline_evaluation::{BatchRunner, EvalInput, Faithfulness, Relevancy};
///
/// # async fn run(llm: Arc<dyn Llm>, inputs: Vec<EvalInput>) -> ragline_core::Result<()> {
/// let runner = BatchRunner::new(Arc::new(Faithfulness::new(llm.clone())), 8)
///     .with_evaluator(Arc::new(Relevancy::new(llm)));
///
/// let by_evaluator = runner.evaluate_many(&inputs, &CallContext::new()).await?;
/// for (name, results) in &by_evaluator {
///     println!("{name}: {:?}", ragline_evaluation::BatchSummary::from_results(results));
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct BatchRunner {
    evaluators: Vec<Arc<dyn Evaluator>>,
    concurrency: usize,
}

impl BatchRunner {
    /// Create a runner for one evaluator. A concurrency of 0 is raised to 1.
    pub fn new(evaluator: Arc<dyn Evaluator>, concurrency: usize) -> Self {
        Self {
            evaluators: vec![evaluator],
            concurrency: concurrency.max(1),
        }
    }

    /// Create a runner using the configured concurrency.
    pub fn from_config(evaluator: Arc<dyn Evaluator>, config: &EvaluationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(evaluator, config.concurrency))
    }

    /// Add another evaluator for [`BatchRunner::evaluate_many`].
    #[must_use]
    pub fn with_evaluator(mut self, evaluator: Arc<dyn Evaluator>) -> Self {
        self.evaluators.push(evaluator);
        self
    }

    /// Maximum evaluations in flight.
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Evaluate every input with the primary evaluator.
    ///
    /// `results[i]` belongs to `inputs[i]`.
    #[instrument(skip(self, inputs, ctx), fields(inputs = inputs.len(), concurrency = self.concurrency))]
    pub async fn evaluate(&self, inputs: &[EvalInput], ctx: &CallContext) -> Result<Vec<EvalResult>> {
        let evaluator = Arc::clone(&self.evaluators[0]);
        let jobs = inputs.iter().map(|input| (Arc::clone(&evaluator), input));
        let results = self.run_jobs(jobs, ctx).await?;

        let summary = BatchSummary::from_results(&results);
        info!(
            evaluator = evaluator.name(),
            total = summary.total,
            passing = summary.passing,
            failed = summary.failed,
            "batch evaluation completed"
        );
        Ok(results)
    }

    /// Evaluate every input with every evaluator, keyed by evaluator name.
    ///
    /// All `(evaluator, input)` pairs share one concurrency budget.
    #[instrument(skip(self, inputs, ctx), fields(inputs = inputs.len(), evaluators = self.evaluators.len()))]
    pub async fn evaluate_many(
        &self,
        inputs: &[EvalInput],
        ctx: &CallContext,
    ) -> Result<BTreeMap<String, Vec<EvalResult>>> {
        let jobs = self
            .evaluators
            .iter()
            .flat_map(|evaluator| inputs.iter().map(move |input| (Arc::clone(evaluator), input)));
        let mut flat = self.run_jobs(jobs, ctx).await?.into_iter();

        let mut by_name = BTreeMap::new();
        for evaluator in &self.evaluators {
            let results: Vec<EvalResult> = flat.by_ref().take(inputs.len()).collect();
            if by_name.insert(evaluator.name().to_string(), results).is_some() {
                warn!(
                    evaluator = evaluator.name(),
                    "duplicate evaluator name; earlier results replaced"
                );
            }
        }
        Ok(by_name)
    }

    async fn run_jobs<'a, I>(&self, jobs: I, ctx: &CallContext) -> Result<Vec<EvalResult>>
    where
        I: Iterator<Item = (Arc<dyn Evaluator>, &'a EvalInput)>,
    {
        let evaluations = stream::iter(jobs)
            .map(|(evaluator, input)| async move {
                match evaluator.evaluate(input, ctx).await {
                    Ok(result) => result,
                    Err(err) => {
                        warn!(evaluator = evaluator.name(), error = %err, "evaluation failed");
                        EvalResult::failed(&err, input)
                    }
                }
            })
            .buffered(self.concurrency)
            .collect::<Vec<_>>();

        ctx.run("batch evaluation", async { Ok(evaluations.await) })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ragline_core::RaglineError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use crate::EvalField;

    /// Sleeps longer for earlier inputs so completion order is reversed.
    #[derive(Debug, Default)]
    struct SlowFirst {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl Evaluator for SlowFirst {
        async fn evaluate(&self, input: &EvalInput, _ctx: &CallContext) -> Result<EvalResult> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            let index: u64 = input.text(EvalField::Query)?.parse().unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(5 * (10 - index.min(10)))).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if index == 3 {
                return Err(RaglineError::transport("connection reset"));
            }
            #[allow(clippy::cast_precision_loss)]
            let score = index as f64;
            Ok(EvalResult::new(score, 0.0, "ok").with_input(input))
        }

        fn required_fields(&self) -> &'static [EvalField] {
            &[EvalField::Query]
        }

        fn name(&self) -> &'static str {
            "SlowFirst"
        }
    }

    fn inputs(n: usize) -> Vec<EvalInput> {
        (0..n).map(|i| EvalInput::new().with_query(i.to_string())).collect()
    }

    #[tokio::test]
    async fn test_order_preserved_and_errors_captured() {
        let evaluator = Arc::new(SlowFirst::default());
        let runner = BatchRunner::new(evaluator.clone(), 3);
        let results = runner.evaluate(&inputs(8), &CallContext::new()).await.unwrap();

        assert_eq!(results.len(), 8);
        for (i, result) in results.iter().enumerate() {
            assert_eq!(result.query.as_deref(), Some(i.to_string().as_str()));
        }
        assert!(results[3].is_failed());
        assert!(results[3].feedback.contains("connection reset"));
        assert!(!results[4].is_failed());
        assert!(evaluator.peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_cancelled_batch_returns_error() {
        let runner = BatchRunner::new(Arc::new(SlowFirst::default()), 2);
        let ctx = CallContext::new();
        ctx.cancel();
        let err = runner.evaluate(&inputs(4), &ctx).await.unwrap_err();
        assert!(matches!(err, RaglineError::Cancelled));
    }

    #[test]
    fn test_zero_concurrency_raised() {
        assert_eq!(BatchRunner::new(Arc::new(SlowFirst::default()), 0).concurrency(), 1);
    }
}
