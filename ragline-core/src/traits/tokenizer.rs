//! Token counting.
//!
//! Memory variants only need to know how long a piece of text is, so the
//! tokenizer interface is a single `count_tokens` call. Any
//! `Fn(&str) -> usize` closure can be used directly.

use std::sync::Arc;

use tiktoken_rs::CoreBPE;

use crate::{RaglineError, Result};

/// Counts tokens in text.
pub trait Tokenizer: Send + Sync + std::fmt::Debug {
    /// Number of tokens in `text`.
    fn count_tokens(&self, text: &str) -> usize;
}

/// Approximation of one token per `chars_per_token` characters, rounded up.
///
/// Used when no provider-specific tokenizer is available.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ApproximateTokenizer {
    chars_per_token: f32,
}

impl Default for ApproximateTokenizer {
    fn default() -> Self {
        Self {
            chars_per_token: 4.0,
        }
    }
}

impl ApproximateTokenizer {
    /// Create an approximating tokenizer. Non-positive ratios fall back to 4.
    pub fn new(chars_per_token: f32) -> Self {
        if chars_per_token.is_finite() && chars_per_token > 0.0 {
            Self { chars_per_token }
        } else {
            Self::default()
        }
    }
}

impl Tokenizer for ApproximateTokenizer {
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    fn count_tokens(&self, text: &str) -> usize {
        let chars = text.chars().count();
        (chars as f32 / self.chars_per_token).ceil() as usize
    }
}

/// One token per whitespace-separated word.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WhitespaceTokenizer;

impl Tokenizer for WhitespaceTokenizer {
    fn count_tokens(&self, text: &str) -> usize {
        text.split_whitespace().count()
    }
}

/// BPE token counts from `tiktoken-rs`.
#[derive(Clone)]
pub struct TiktokenTokenizer {
    bpe: Arc<CoreBPE>,
    encoding: String,
}

impl std::fmt::Debug for TiktokenTokenizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TiktokenTokenizer")
            .field("encoding", &self.encoding)
            .finish_non_exhaustive()
    }
}

impl TiktokenTokenizer {
    /// The `cl100k_base` encoding used by GPT-3.5/4 class models.
    pub fn cl100k() -> Result<Self> {
        let bpe = tiktoken_rs::cl100k_base()
            .map_err(|e| RaglineError::configuration(format!("failed to load cl100k_base: {e}")))?;
        Ok(Self {
            bpe: Arc::new(bpe),
            encoding: "cl100k_base".to_string(),
        })
    }

    /// The encoding used by a named model, e.g. `gpt-4o`.
    pub fn for_model(model: &str) -> Result<Self> {
        let bpe = tiktoken_rs::get_bpe_from_model(model).map_err(|e| {
            RaglineError::configuration(format!("no tokenizer for model '{model}': {e}"))
        })?;
        Ok(Self {
            bpe: Arc::new(bpe),
            encoding: model.to_string(),
        })
    }
}

impl Tokenizer for TiktokenTokenizer {
    fn count_tokens(&self, text: &str) -> usize {
        self.bpe.encode_with_special_tokens(text).len()
    }
}

/// Closure-backed tokenizer.
#[derive(Clone)]
pub struct FnTokenizer<F>(pub F);

impl<F> std::fmt::Debug for FnTokenizer<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FnTokenizer")
    }
}

impl<F> Tokenizer for FnTokenizer<F>
where
    F: Fn(&str) -> usize + Send + Sync,
{
    fn count_tokens(&self, text: &str) -> usize {
        (self.0)(text)
    }
}

impl<T: Tokenizer + ?Sized> Tokenizer for Arc<T> {
    fn count_tokens(&self, text: &str) -> usize {
        (**self).count_tokens(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("", 0 ; "empty")]
    #[test_case("abcd", 1 ; "exact")]
    #[test_case("abcde", 2 ; "rounds up")]
    #[test_case("héllo wörld", 3 ; "counts chars not bytes")]
    fn test_approximate_counts(text: &str, expected: usize) {
        assert_eq!(ApproximateTokenizer::default().count_tokens(text), expected);
    }

    #[test]
    fn test_whitespace_counts_words() {
        assert_eq!(WhitespaceTokenizer.count_tokens("  one two\tthree\nfour "), 4);
    }

    #[test]
    fn test_closure_tokenizer() {
        let tokenizer = FnTokenizer(|text: &str| text.len());
        assert_eq!(tokenizer.count_tokens("abc"), 3);
    }

    #[test]
    fn test_tiktoken_counts() {
        let tokenizer = TiktokenTokenizer::cl100k().unwrap();
        assert!(tokenizer.count_tokens("hello world") >= 2);
        assert_eq!(tokenizer.count_tokens(""), 0);
    }
}
