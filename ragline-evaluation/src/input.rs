//! Evaluation inputs.

use ragline_core::{RaglineError, Result};
use serde::{Deserialize, Serialize};

/// A field of [`EvalInput`] that an evaluator may require.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EvalField {
    /// The user query.
    Query,
    /// The generated response under evaluation.
    Response,
    /// The retrieved contexts the response should be grounded in.
    Contexts,
    /// A reference answer.
    Reference,
}

/// The material an evaluator judges.
///
/// Every field is optional; each evaluator declares the fields it needs and
/// rejects inputs missing any of them. Blank strings and an empty context
/// list count as missing.
///
/// # Examples
///
/// ```rust
/// use ragline_evaluation::{EvalField, EvalInput};
///
/// let input = EvalInput::new()
///     .with_query("What is LlamaIndex?")
///     .with_response("A data framework for LLM applications.")
///     .with_context("LlamaIndex is a data framework for LLM applications.");
///
/// assert!(input.require(&[EvalField::Query, EvalField::Contexts]).is_ok());
/// assert!(input.require(&[EvalField::Reference]).is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalInput {
    /// The user query.
    pub query: Option<String>,
    /// The generated response.
    pub response: Option<String>,
    /// Retrieved contexts.
    pub contexts: Option<Vec<String>>,
    /// A reference answer.
    pub reference: Option<String>,
}

impl EvalInput {
    /// Create an empty input.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the query.
    #[must_use]
    pub fn with_query<S: Into<String>>(mut self, query: S) -> Self {
        self.query = Some(query.into());
        self
    }

    /// Set the response.
    #[must_use]
    pub fn with_response<S: Into<String>>(mut self, response: S) -> Self {
        self.response = Some(response.into());
        self
    }

    /// Replace the contexts.
    #[must_use]
    pub fn with_contexts<I, S>(mut self, contexts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.contexts = Some(contexts.into_iter().map(Into::into).collect());
        self
    }

    /// Append one context.
    #[must_use]
    pub fn with_context<S: Into<String>>(mut self, context: S) -> Self {
        self.contexts
            .get_or_insert_with(Vec::new)
            .push(context.into());
        self
    }

    /// Set the reference answer.
    #[must_use]
    pub fn with_reference<S: Into<String>>(mut self, reference: S) -> Self {
        self.reference = Some(reference.into());
        self
    }

    /// Whether `field` holds a usable value.
    pub fn has(&self, field: EvalField) -> bool {
        match field {
            EvalField::Query => present(self.query.as_deref()),
            EvalField::Response => present(self.response.as_deref()),
            EvalField::Reference => present(self.reference.as_deref()),
            EvalField::Contexts => self.contexts.as_ref().is_some_and(|c| !c.is_empty()),
        }
    }

    /// Check that every field in `fields` is present.
    ///
    /// The error names all missing fields at once.
    pub fn require(&self, fields: &[EvalField]) -> Result<()> {
        let missing: Vec<String> = fields
            .iter()
            .filter(|field| !self.has(**field))
            .map(ToString::to_string)
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(RaglineError::validation(format!(
                "evaluation input is missing required fields: {}",
                missing.join(", ")
            )))
        }
    }

    /// A required text field.
    pub fn text(&self, field: EvalField) -> Result<&str> {
        let value = match field {
            EvalField::Query => self.query.as_deref(),
            EvalField::Response => self.response.as_deref(),
            EvalField::Reference => self.reference.as_deref(),
            EvalField::Contexts => {
                return Err(RaglineError::validation(
                    "contexts is a list; use EvalInput::context_list",
                ));
            }
        };
        value
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| RaglineError::validation(format!("evaluation input is missing {field}")))
    }

    /// The required, non-empty context list.
    pub fn context_list(&self) -> Result<&[String]> {
        self.contexts
            .as_deref()
            .filter(|c| !c.is_empty())
            .ok_or_else(|| RaglineError::validation("evaluation input is missing contexts"))
    }
}

fn present(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.trim().is_empty())
}
