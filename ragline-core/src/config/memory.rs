//! Configuration for chat memory buffers.

use serde::{Deserialize, Serialize};

use crate::{RaglineError, Result};

/// Default instruction used by the summarizing memory.
pub const DEFAULT_SUMMARIZE_PROMPT: &str = "Progressively summarize the lines of conversation provided, adding onto the previous summary returning a new summary.";

/// Configuration for token-bounded and summarizing memories.
///
/// # Examples
///
/// ```rust
/// use ragline_core::config::MemoryConfig;
///
/// let config = MemoryConfig::new(3000).with_summary_token_limit(1500);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Token budget of the buffered memory.
    pub token_limit: usize,

    /// Token budget above which the summarizing memory condenses history.
    pub summary_token_limit: usize,

    /// System instruction sent to the summary model.
    pub summarize_prompt: String,

    /// Characters per token for the approximating tokenizer.
    pub chars_per_token: f32,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            token_limit: 3000,
            summary_token_limit: 3000,
            summarize_prompt: DEFAULT_SUMMARIZE_PROMPT.to_string(),
            chars_per_token: 4.0,
        }
    }
}

impl MemoryConfig {
    /// Create a configuration with the given token limit for both budgets.
    pub fn new(token_limit: usize) -> Self {
        Self {
            token_limit,
            summary_token_limit: token_limit,
            ..Default::default()
        }
    }

    /// Set the summarization budget.
    #[must_use]
    pub fn with_summary_token_limit(mut self, limit: usize) -> Self {
        self.summary_token_limit = limit;
        self
    }

    /// Set the summarization instruction.
    pub fn with_summarize_prompt<S: Into<String>>(mut self, prompt: S) -> Self {
        self.summarize_prompt = prompt.into();
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.token_limit == 0 {
            return Err(RaglineError::configuration(
                "Memory token limit must be greater than 0",
            ));
        }
        if self.summary_token_limit == 0 {
            return Err(RaglineError::configuration(
                "Summary token limit must be greater than 0",
            ));
        }
        if self.summarize_prompt.trim().is_empty() {
            return Err(RaglineError::configuration(
                "Summarize prompt cannot be empty",
            ));
        }
        if !(self.chars_per_token.is_finite() && self.chars_per_token > 0.0) {
            return Err(RaglineError::configuration(
                "Characters per token must be a positive number",
            ));
        }
        Ok(())
    }
}
