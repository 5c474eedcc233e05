//! Query bundles handed to postprocessors.

use serde::{Deserialize, Serialize};

use crate::{CallContext, Embedder, Result};

/// A query string plus an optional pre-computed embedding.
///
/// # Examples
///
/// ```rust
/// use ragline_core::QueryBundle;
///
/// let query = QueryBundle::new("What is sentence-window retrieval?");
/// assert!(query.embedding.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryBundle {
    /// The query text.
    pub query_str: String,

    /// Pre-computed query embedding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl QueryBundle {
    /// Create a query bundle without an embedding.
    pub fn new<S: Into<String>>(query_str: S) -> Self {
        Self {
            query_str: query_str.into(),
            embedding: None,
        }
    }

    /// Attach a pre-computed embedding.
    #[must_use]
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// Return the embedding, asking `embedder` for one if it is absent.
    pub async fn ensure_embedding(
        &mut self,
        embedder: &dyn Embedder,
        ctx: &CallContext,
    ) -> Result<&[f32]> {
        if self.embedding.is_none() {
            let embedding = embedder.get_text_embedding(&self.query_str, ctx).await?;
            self.embedding = Some(embedding);
        }
        Ok(self.embedding.as_deref().unwrap_or_default())
    }
}

impl From<&str> for QueryBundle {
    fn from(query_str: &str) -> Self {
        Self::new(query_str)
    }
}

impl From<String> for QueryBundle {
    fn from(query_str: String) -> Self {
        Self::new(query_str)
    }
}
