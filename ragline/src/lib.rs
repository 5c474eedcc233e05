//! # ragline
//!
//! The orchestration core of a retrieval-augmented generation stack:
//! conversation memory, node postprocessing, and response evaluation over a
//! capability-typed LLM abstraction.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use ragline::prelude::*;
//!
//! # async fn run(llm: Arc<dyn Llm>) -> ragline::core::Result<()> {
//! let ctx = CallContext::new();
//!
//! let mut memory = TokenBufferMemory::new(1500);
//! memory.put(ChatMessage::user("What is ragline?"), &ctx).await?;
//!
//! let input = EvalInput::new()
//!     .with_query("What is ragline?")
//!     .with_response("A RAG orchestration core.")
//!     .with_context("ragline provides memory, postprocessors, and evaluators.");
//! let result = Relevancy::new(llm).evaluate(&input, &ctx).await?;
//! println!("passing: {}", result.passing);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - **ragline-core**: Types, capability traits, cancellation, errors, and configuration
//! - **ragline-query**: Chat memory and node postprocessors
//! - **ragline-evaluation**: Evaluators and the batch runner
//! - **ragline-integrations**: Provider adapters

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Re-export all public APIs from sub-crates
pub use ragline_core as core;
pub use ragline_evaluation as evaluation;
pub use ragline_integrations as integrations;
pub use ragline_query as query;

/// Prelude module for convenient imports.
///
/// Re-exports the most commonly used types and traits from every member
/// crate.
pub mod prelude {
    pub use ragline_evaluation::prelude::*;
    pub use ragline_integrations::prelude::*;
    pub use ragline_query::prelude::*;
}

/// Version information for the ragline crates.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
