//! # Ragline Core
//!
//! Core traits, types, and primitives shared by the ragline crates:
//!
//! - **Schema types**: `TextNode`, `NodeWithScore`, `QueryBundle`, `ChatMessage`
//! - **Collaborator traits**: capability-typed LLM traits (`Llm`,
//!   `StreamingLlm`, `ToolCallingLlm`, `StructuredOutputLlm`), `Embedder`,
//!   and `Tokenizer`
//! - **Primitives**: vector similarity, cancellation-carrying `CallContext`,
//!   bounded stream channels, and a retry-once helper
//! - **Configuration**: serde/TOML configuration structs with validation
//! - **Error handling**: the `RaglineError` taxonomy
//!
//! ## Quick Start
//!
//! ```rust
//! use ragline_core::prelude::*;
//!
//! let node = TextNode::builder()
//!     .text("Neural networks are inspired by the human brain.")
//!     .metadata("window", "Deep learning uses layered architectures.")
//!     .build()
//!     .unwrap();
//! let scored = NodeWithScore::new(node, 0.82);
//! assert!(scored.node.metadata_str("window").is_some());
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod prelude;

pub mod config;
pub mod context;
pub mod error;
pub mod relationships;
pub mod retry;
pub mod similarity;
pub mod stream;
pub mod traits;
pub mod types;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use context::CallContext;
pub use error::{ErrorKind, RaglineError, Result};
pub use relationships::{NodeRelationship, NodeRelationships, RelatedNodeInfo, RelatedNodeType};
pub use retry::retry_once;
pub use similarity::SimilarityMode;
pub use stream::{StreamSender, stream_channel};
pub use types::{
    ChatMessage, ContentBlock, MessageRole, MetadataMode, NodeWithScore, QueryBundle, TextNode,
    TextNodeBuilder, ensure_unique_ids,
};

pub use traits::*;

/// Version information for the ragline core library.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
