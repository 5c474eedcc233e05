//! Collaborator traits consumed by the memory, postprocessing, and
//! evaluation layers.

pub mod embedder;
pub mod llm;
pub mod tokenizer;

pub use embedder::*;
pub use llm::*;
pub use tokenizer::*;
