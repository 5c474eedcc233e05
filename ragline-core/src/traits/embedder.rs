//! Embedding generation traits.
//!
//! Embeddings are dense vectors capturing the meaning of a text. The
//! semantic-similarity evaluator and [`crate::QueryBundle::ensure_embedding`]
//! consume them through [`Embedder`].

use async_trait::async_trait;

use crate::{CallContext, Result};

/// Generates dense embeddings for text content.
///
/// All vectors produced by one instance have the same dimension. The trait
/// does not cache; callers that want caching wrap the embedder.
///
/// # Examples
///
/// ```rust,no_run
/// use async_trait::async_trait;
/// use ragline_core::{CallContext, Embedder, Result};
///
/// #[derive(Debug)]
/// struct ConstantEmbedder {
///     dimension: usize,
/// }
///
/// #[async_trait]
/// impl Embedder for ConstantEmbedder {
///     async fn get_text_embedding(&self, _text: &str, ctx: &CallContext) -> Result<Vec<f32>> {
///         ctx.check("embed")?;
///         Ok(vec![0.1; self.dimension])
///     }
///
///     fn dimension(&self) -> usize {
///         self.dimension
///     }
///
///     fn model_name(&self) -> &str {
///         "constant"
///     }
/// }
/// ```
#[async_trait]
pub trait Embedder: Send + Sync + std::fmt::Debug {
    /// Generate the embedding for a single text.
    ///
    /// # Errors
    ///
    /// Returns a transport or provider error when the backing model fails,
    /// and `Cancelled`/`Timeout` when the context ends first.
    async fn get_text_embedding(&self, text: &str, ctx: &CallContext) -> Result<Vec<f32>>;

    /// Generate embeddings for several texts, in input order.
    ///
    /// The default implementation embeds one text at a time. Providers with
    /// a native batch endpoint should override it.
    async fn get_text_embedding_batch(
        &self,
        texts: &[&str],
        ctx: &CallContext,
    ) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            ctx.check("embedding batch")?;
            embeddings.push(self.get_text_embedding(text, ctx).await?);
        }
        Ok(embeddings)
    }

    /// Dimension of the vectors this embedder produces.
    fn dimension(&self) -> usize;

    /// Name of the underlying model.
    fn model_name(&self) -> &str;
}
