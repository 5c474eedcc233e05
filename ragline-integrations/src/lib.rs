//! Provider adapters for ragline.
//!
//! [`ProviderSettings`] resolves connection details, reading the environment
//! only when asked to. With the `siumai` feature, [`SiumaiLlm`] implements
//! [`ragline_core::Llm`] and [`ragline_core::StreamingLlm`] over an
//! OpenAI-compatible endpoint.
//!
//! ```rust,ignore
//! use ragline_core::{CallContext, Llm};
//! use ragline_integrations::SiumaiLlm;
//!
//! # async fn run() -> ragline_core::Result<()> {
//! let llm = SiumaiLlm::openai_from_env("gpt-4o-mini").await?;
//! let answer = llm.complete("Say hello", &CallContext::new()).await?;
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod settings;
#[cfg(feature = "siumai")]
pub mod siumai;

pub use settings::{OPENAI_API_KEY_ENV, OPENAI_URL_ENV, ProviderSettings};
#[cfg(feature = "siumai")]
pub use siumai::SiumaiLlm;

/// Re-export commonly used types.
pub mod prelude {
    pub use crate::ProviderSettings;
    #[cfg(feature = "siumai")]
    pub use crate::SiumaiLlm;
}
