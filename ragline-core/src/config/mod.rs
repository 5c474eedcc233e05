//! Configuration types.
//!
//! Every configuration struct is serde-serializable, has sensible defaults,
//! and exposes `validate()`. [`RaglineConfig`] aggregates them and loads
//! from TOML, validating on load.

pub mod evaluation;
pub mod memory;
pub mod postprocessor;

pub use evaluation::*;
pub use memory::*;
pub use postprocessor::*;

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::{RaglineError, Result};

/// Top-level configuration.
///
/// # Examples
///
/// ```rust
/// use ragline_core::config::RaglineConfig;
///
/// let config = RaglineConfig::from_toml_str(
///     r#"
///     [memory]
///     token_limit = 1200
///
///     [rerank]
///     top_n = 3
///
///     [evaluation]
///     similarity_mode = "euclidean"
///     similarity_threshold = -1.0
///     "#,
/// )
/// .unwrap();
/// assert_eq!(config.memory.token_limit, 1200);
/// assert_eq!(config.rerank.top_n, 3);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaglineConfig {
    /// Memory buffers.
    pub memory: MemoryConfig,
    /// Rerankers.
    pub rerank: RerankConfig,
    /// Evaluators and batch runner.
    pub evaluation: EvaluationConfig,
}

impl RaglineConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)
            .map_err(|e| RaglineError::configuration(format!("invalid TOML config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse, and validate a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            RaglineError::configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&raw)
    }

    /// Render as TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| RaglineError::internal(format!("cannot serialize config: {e}")))
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<()> {
        self.memory.validate()?;
        self.rerank.validate()?;
        self.evaluation.validate()
    }
}
