//! Core data types: nodes, queries, and chat messages.

pub mod chat;
pub mod node;
pub mod query;

// Re-export all types for convenience
pub use chat::*;
pub use node::*;
pub use query::*;
