//! Node postprocessing.
//!
//! Postprocessors transform the scored nodes produced by retrieval before
//! they are packed into a prompt: rewriting text from metadata, reranking
//! with an LLM judge, and reordering for long contexts. [`PostprocessorChain`]
//! applies several in sequence.
//!
//! Every variant consumes its input list and returns a fresh list that is no
//! longer than the input and keeps node ids intact.

use async_trait::async_trait;
use ragline_core::{CallContext, NodeWithScore, QueryBundle, Result};

pub mod chain;
pub mod llm_rerank;
pub mod long_context_reorder;
pub mod metadata_replacement;
pub mod rankgpt;

pub use chain::*;
pub use llm_rerank::*;
pub use long_context_reorder::*;
pub use metadata_replacement::*;
pub use rankgpt::*;

/// Core trait for node postprocessing.
#[async_trait]
pub trait NodePostprocessor: Send + Sync + std::fmt::Debug {
    /// Postprocess a list of scored nodes.
    ///
    /// # Errors
    ///
    /// Returns a validation error when two input nodes share an id or when
    /// the postprocessor needs a query and none is given. LLM-backed
    /// variants also surface provider, parse, and cancellation errors.
    async fn postprocess_nodes(
        &self,
        nodes: Vec<NodeWithScore>,
        query: Option<&QueryBundle>,
        ctx: &CallContext,
    ) -> Result<Vec<NodeWithScore>>;

    /// Get the name of this postprocessor for logging/debugging.
    fn name(&self) -> &'static str;
}

/// Closed set of postprocessors with static dispatch.
#[derive(Debug)]
pub enum AnyPostprocessor {
    /// Replace text with a metadata value.
    MetadataReplacement(MetadataReplacement),
    /// Score nodes with an LLM judge.
    LlmRerank(LlmRerank),
    /// Permute nodes with an LLM judge.
    RankGpt(RankGptRerank),
    /// Move strong nodes to the ends.
    LongContextReorder(LongContextReorder),
    /// Apply several postprocessors in order.
    Chain(PostprocessorChain),
}

#[async_trait]
impl NodePostprocessor for AnyPostprocessor {
    async fn postprocess_nodes(
        &self,
        nodes: Vec<NodeWithScore>,
        query: Option<&QueryBundle>,
        ctx: &CallContext,
    ) -> Result<Vec<NodeWithScore>> {
        match self {
            Self::MetadataReplacement(p) => p.postprocess_nodes(nodes, query, ctx).await,
            Self::LlmRerank(p) => p.postprocess_nodes(nodes, query, ctx).await,
            Self::RankGpt(p) => p.postprocess_nodes(nodes, query, ctx).await,
            Self::LongContextReorder(p) => p.postprocess_nodes(nodes, query, ctx).await,
            Self::Chain(p) => p.postprocess_nodes(nodes, query, ctx).await,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::MetadataReplacement(p) => p.name(),
            Self::LlmRerank(p) => p.name(),
            Self::RankGpt(p) => p.name(),
            Self::LongContextReorder(p) => p.name(),
            Self::Chain(p) => p.name(),
        }
    }
}

macro_rules! impl_from_postprocessor {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for AnyPostprocessor {
                fn from(p: $ty) -> Self {
                    Self::$variant(p)
                }
            }
        )*
    };
}

impl_from_postprocessor! {
    MetadataReplacement => MetadataReplacement,
    LlmRerank => LlmRerank,
    RankGpt => RankGptRerank,
    LongContextReorder => LongContextReorder,
    Chain => PostprocessorChain,
}

/// Query text required by LLM-backed postprocessors.
pub(crate) fn require_query<'a>(query: Option<&'a QueryBundle>, name: &str) -> Result<&'a str> {
    query
        .map(|q| q.query_str.as_str())
        .ok_or_else(|| ragline_core::RaglineError::validation(format!("{name} requires a query")))
}
