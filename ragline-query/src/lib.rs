//! Conversation memory and node postprocessing for the ragline RAG core.
//!
//! This crate provides the stateful and transformational pieces that sit
//! between retrieval and generation:
//!
//! - **Memory**: append-only, token-bounded, and LLM-summarizing chat
//!   buffers behind the [`memory::ChatMemory`] trait
//! - **Postprocessors**: metadata replacement, LLM and RankGPT reranking,
//!   long-context reordering, and sequential chains behind the
//!   [`postprocessor::NodePostprocessor`] trait
//!
//! # Quick Start
//!
//! ```rust
//! use ragline_query::prelude::*;
//!
//! # async fn example() -> Result<()> {
//! let ctx = CallContext::new();
//! let mut memory = TokenBufferMemory::new(1000);
//! memory.put(ChatMessage::system("You are helpful."), &ctx).await?;
//! memory.put(ChatMessage::user("What is RAG?"), &ctx).await?;
//!
//! let history = memory.get(Some("And why use it?"))?;
//! assert_eq!(history.len(), 2);
//!
//! let nodes = vec![
//!     NodeWithScore::new(TextNode::new("a"), 0.9),
//!     NodeWithScore::new(TextNode::new("b"), 0.5),
//!     NodeWithScore::new(TextNode::new("c"), 0.7),
//! ];
//! let reordered = LongContextReorder::new()
//!     .postprocess_nodes(nodes, None, &ctx)
//!     .await?;
//! assert_eq!(reordered.len(), 3);
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod memory;
pub mod postprocessor;

/// Re-export commonly used types and traits.
pub mod prelude {
    pub use crate::memory::{
        AnyMemory, ChatMemory, SharedMemory, SimpleMemory, SummaryMemory, TokenBufferMemory,
    };
    pub use crate::postprocessor::{
        AnyPostprocessor, LlmRerank, LongContextReorder, MetadataReplacement, NodePostprocessor,
        PostprocessorChain, PostprocessorChainBuilder, RankGptRerank,
    };

    // Re-export core types
    pub use ragline_core::prelude::*;
}
