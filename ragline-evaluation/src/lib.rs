//! Response evaluation for the ragline RAG core.
//!
//! Evaluators judge one [`EvalInput`] at a time and return an [`EvalResult`]
//! whose `passing` flag is fixed against a threshold:
//!
//! | Evaluator | Requires | Score |
//! |---|---|---|
//! | [`Faithfulness`] | response, contexts | 1.0 YES / 0.0 NO |
//! | [`Relevancy`] | query, response, contexts | 1.0 YES / 0.0 NO |
//! | [`Correctness`] | query, response, reference | judge rating 1 to 5 |
//! | [`ContextRelevancy`] | query, contexts | share of relevant contexts |
//! | [`SemanticSimilarity`] | response, reference | embedding similarity |
//!
//! [`BatchRunner`] evaluates many inputs with bounded concurrency, keeps
//! input order, and turns per-input errors into failed results.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use ragline_core::{CallContext, Llm};
//! use ragline_evaluation::prelude::*;
//!
//! # async fn example(llm: Arc<dyn Llm>) -> ragline_core::Result<()> {
//! let input = EvalInput::new()
//!     .with_response("LlamaIndex was founded in 2015 in San Francisco.")
//!     .with_context("LlamaIndex is a data framework for LLM applications.");
//!
//! let result = Faithfulness::new(llm).evaluate(&input, &CallContext::new()).await?;
//! println!("passing={} feedback={}", result.passing, result.feedback);
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod evaluator;
pub mod input;
pub mod parsing;
pub mod result;
pub mod runner;

pub use evaluator::*;
pub use input::{EvalField, EvalInput};
pub use result::{BatchSummary, EvalResult};
pub use runner::BatchRunner;

/// Re-export commonly used types and traits.
pub mod prelude {
    pub use crate::evaluator::{
        AnyEvaluator, ContextRelevancy, Correctness, Evaluator, Faithfulness, Relevancy,
        SemanticSimilarity,
    };
    pub use crate::{BatchRunner, BatchSummary, EvalField, EvalInput, EvalResult};
}
