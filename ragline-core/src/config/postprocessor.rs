//! Configuration for LLM-driven postprocessors.

use serde::{Deserialize, Serialize};

use crate::{RaglineError, Result};

/// Configuration for the LLM and permutation rerankers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankConfig {
    /// Number of nodes to keep.
    pub top_n: usize,

    /// Nodes per judge call. `None` sends all nodes in one batch.
    pub batch_size: Option<usize>,

    /// Prompt override with `{context_str}` and `{query_str}` placeholders.
    pub prompt_template: Option<String>,
}

impl Default for RerankConfig {
    fn default() -> Self {
        Self {
            top_n: 10,
            batch_size: None,
            prompt_template: None,
        }
    }
}

impl RerankConfig {
    /// Create a configuration keeping `top_n` nodes.
    pub fn new(top_n: usize) -> Self {
        Self {
            top_n,
            ..Default::default()
        }
    }

    /// Set the batch size.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    /// Set a custom prompt template.
    pub fn with_prompt_template<S: Into<String>>(mut self, template: S) -> Self {
        self.prompt_template = Some(template.into());
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.top_n == 0 {
            return Err(RaglineError::configuration("top_n must be greater than 0"));
        }
        if self.batch_size == Some(0) {
            return Err(RaglineError::configuration(
                "batch_size must be greater than 0",
            ));
        }
        if let Some(template) = &self.prompt_template {
            for placeholder in ["{context_str}", "{query_str}"] {
                if !template.contains(placeholder) {
                    return Err(RaglineError::configuration(format!(
                        "rerank prompt template is missing {placeholder}"
                    )));
                }
            }
        }
        Ok(())
    }
}
