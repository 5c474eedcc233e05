//! Postprocessor chain management for sequential node processing.

use async_trait::async_trait;
use ragline_core::{CallContext, NodeWithScore, QueryBundle, Result, ensure_unique_ids};
use std::sync::Arc;
use tracing::{debug, info, instrument};

use super::NodePostprocessor;

/// A chain of postprocessors applied left to right; the output of each is
/// the input of the next. An empty chain returns its input unchanged.
///
/// Errors are never swallowed: the first failing step aborts the chain.
///
/// # Examples
///
/// ```rust
/// use ragline_query::postprocessor::{LongContextReorder, MetadataReplacement, PostprocessorChain};
/// use std::sync::Arc;
///
/// let chain = PostprocessorChain::builder()
///     .add_processor(Arc::new(MetadataReplacement::new("window")))
///     .add_processor(Arc::new(LongContextReorder::new()))
///     .build();
/// assert_eq!(chain.processor_names(), vec!["MetadataReplacement", "LongContextReorder"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct PostprocessorChain {
    /// The postprocessors to apply in sequence.
    processors: Vec<Arc<dyn NodePostprocessor>>,

    /// Whether to log each step at info level.
    verbose: bool,
}

impl PostprocessorChain {
    /// Create a new postprocessor chain.
    pub fn new(processors: Vec<Arc<dyn NodePostprocessor>>) -> Self {
        Self {
            processors,
            verbose: false,
        }
    }

    /// Start building a chain.
    pub fn builder() -> PostprocessorChainBuilder {
        PostprocessorChainBuilder::new()
    }

    /// Add a postprocessor to the end of the chain.
    pub fn add_processor(&mut self, processor: Arc<dyn NodePostprocessor>) {
        self.processors.push(processor);
    }

    /// Get the number of postprocessors in the chain.
    pub fn len(&self) -> usize {
        self.processors.len()
    }

    /// Check if the chain is empty.
    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }

    /// Get the names of all postprocessors in the chain.
    pub fn processor_names(&self) -> Vec<&'static str> {
        self.processors.iter().map(|p| p.name()).collect()
    }
}

#[async_trait]
impl NodePostprocessor for PostprocessorChain {
    #[instrument(skip(self, nodes, query, ctx), fields(chain_length = self.processors.len()))]
    async fn postprocess_nodes(
        &self,
        mut nodes: Vec<NodeWithScore>,
        query: Option<&QueryBundle>,
        ctx: &CallContext,
    ) -> Result<Vec<NodeWithScore>> {
        ensure_unique_ids(&nodes)?;
        if self.processors.is_empty() {
            debug!("Empty postprocessor chain, returning nodes unchanged");
            return Ok(nodes);
        }

        let original_count = nodes.len();
        for (index, processor) in self.processors.iter().enumerate() {
            ctx.check(processor.name())?;
            let before_count = nodes.len();
            nodes = processor.postprocess_nodes(nodes, query, ctx).await?;

            if self.verbose {
                info!(
                    step = index + 1,
                    of = self.processors.len(),
                    processor = processor.name(),
                    before = before_count,
                    after = nodes.len(),
                    "postprocessor step completed"
                );
            }
        }

        debug!(
            before = original_count,
            after = nodes.len(),
            "Postprocessor chain completed"
        );
        Ok(nodes)
    }

    fn name(&self) -> &'static str {
        "PostprocessorChain"
    }
}

/// Builder for creating postprocessor chains with a fluent interface.
#[derive(Debug, Default)]
pub struct PostprocessorChainBuilder {
    processors: Vec<Arc<dyn NodePostprocessor>>,
    verbose: bool,
}

impl PostprocessorChainBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a postprocessor to the chain.
    #[must_use]
    pub fn add_processor(mut self, processor: Arc<dyn NodePostprocessor>) -> Self {
        self.processors.push(processor);
        self
    }

    /// Set verbose logging.
    #[must_use]
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Build the postprocessor chain.
    pub fn build(self) -> PostprocessorChain {
        PostprocessorChain {
            processors: self.processors,
            verbose: self.verbose,
        }
    }
}
