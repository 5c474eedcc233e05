//! Provider connection settings.
//!
//! Only this module reads environment variables; the core crates never do.

use ragline_core::{RaglineError, Result};

/// Environment variable holding the OpenAI API key.
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Environment variable overriding the OpenAI-compatible base URL.
pub const OPENAI_URL_ENV: &str = "OPENAI_URL";

/// Connection settings for an OpenAI-compatible provider.
#[derive(Clone, PartialEq)]
pub struct ProviderSettings {
    /// API key.
    pub api_key: String,
    /// Base URL override; the provider default is used when absent.
    pub base_url: Option<String>,
    /// Model name.
    pub model: String,
    /// Sampling temperature.
    pub temperature: Option<f32>,
    /// Output token cap.
    pub max_tokens: Option<u32>,
}

impl std::fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl ProviderSettings {
    /// Settings with an explicit key.
    pub fn new<K: Into<String>, M: Into<String>>(api_key: K, model: M) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: None,
            model: model.into(),
            temperature: None,
            max_tokens: None,
        }
    }

    /// Read `OPENAI_API_KEY` and `OPENAI_URL` from the process environment.
    pub fn openai_from_env<M: Into<String>>(model: M) -> Result<Self> {
        Self::openai_from_lookup(model, |name| std::env::var(name).ok())
    }

    /// Like [`ProviderSettings::openai_from_env`] with a custom variable
    /// lookup.
    pub fn openai_from_lookup<M, F>(model: M, lookup: F) -> Result<Self>
    where
        M: Into<String>,
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup(OPENAI_API_KEY_ENV)
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                RaglineError::configuration(format!("{OPENAI_API_KEY_ENV} is not set"))
            })?;
        let base_url = lookup(OPENAI_URL_ENV).filter(|url| !url.trim().is_empty());

        Ok(Self {
            base_url,
            ..Self::new(api_key, model)
        })
    }

    /// Set the base URL.
    #[must_use]
    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Set the sampling temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the output token cap.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Validate the settings.
    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(RaglineError::configuration("model name must not be empty"));
        }
        if let Some(temperature) = self.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(RaglineError::configuration(
                    "Temperature must be between 0.0 and 2.0",
                ));
            }
        }
        if self.max_tokens == Some(0) {
            return Err(RaglineError::configuration(
                "max_tokens must be greater than 0",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_reads_key_and_url() {
        let settings = ProviderSettings::openai_from_lookup(
            "gpt-4o-mini",
            lookup(&[(OPENAI_API_KEY_ENV, "sk-test"), (OPENAI_URL_ENV, "http://localhost:8080/v1")]),
        )
        .unwrap();
        assert_eq!(settings.api_key, "sk-test");
        assert_eq!(settings.base_url.as_deref(), Some("http://localhost:8080/v1"));
        assert_eq!(settings.model, "gpt-4o-mini");
    }

    #[test]
    fn test_missing_key_is_configuration_error() {
        let err = ProviderSettings::openai_from_lookup("gpt-4o", lookup(&[(OPENAI_API_KEY_ENV, " ")]))
            .unwrap_err();
        assert!(matches!(err, RaglineError::Configuration { .. }));
    }

    #[test]
    fn test_debug_redacts_key() {
        let rendered = format!("{:?}", ProviderSettings::new("sk-secret", "gpt-4o"));
        assert!(!rendered.contains("sk-secret"));
    }

    #[test]
    fn test_validate() {
        assert!(ProviderSettings::new("k", "m").validate().is_ok());
        assert!(ProviderSettings::new("k", "m").with_temperature(3.0).validate().is_err());
        assert!(ProviderSettings::new("k", "").validate().is_err());
    }
}
