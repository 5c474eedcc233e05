//! Commonly used items, for glob import.

pub use crate::config::{EvaluationConfig, MemoryConfig, RaglineConfig, RerankConfig};
pub use crate::similarity::{SimilarityMode, cosine_similarity, dot_product, euclidean_distance, similarity};
pub use crate::{
    ApproximateTokenizer, CallContext, ChatDelta, ChatMessage, ChatResponse, ContentBlock,
    Embedder, ErrorKind, Llm, LlmMetadata, LlmStream, MessageRole, MetadataMode, NodeRelationship,
    NodeWithScore, QueryBundle, RaglineError, RelatedNodeInfo, ResponseFormat, Result,
    StreamingLlm, StructuredOutputLlm, TextNode, Tokenizer, ToolCallingLlm, ToolChoice, ToolSpec,
    WhitespaceTokenizer, retry_once, stream_channel,
};
