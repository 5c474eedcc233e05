//! Error types for the ragline core.
//!
//! Every fallible operation in the workspace returns [`RaglineError`]. The
//! variants follow the error taxonomy the pipeline relies on: validation and
//! configuration problems are fatal for the call, transport failures may be
//! retried once, provider and parse failures surface to the caller, and
//! cancellation returns promptly without retry.

use thiserror::Error;

/// Coarse classification of a [`RaglineError`].
///
/// Callers that only care about the policy to apply (retry, surface, abort)
/// can match on the kind instead of the full error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// Missing required input, mismatched vector lengths, unknown modes.
    Validation,
    /// Component configured in a way that can never succeed.
    Configuration,
    /// Network or HTTP failure talking to a provider.
    Transport,
    /// The provider answered with an error payload.
    Provider,
    /// A judge or rerank response could not be parsed.
    Parse,
    /// Structured output did not match the requested format.
    Format,
    /// The call context was cancelled.
    Cancelled,
    /// The call context deadline elapsed.
    Timeout,
    /// Anything else.
    Internal,
}

/// Core error type for ragline.
#[derive(Error, Debug)]
pub enum RaglineError {
    /// Input validation errors
    #[error("Validation error: {message}")]
    Validation {
        /// Detailed error message
        message: String,
    },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration {
        /// Detailed error message
        message: String,
    },

    /// Provider transport failures (network, connection reset, HTTP 5xx)
    #[error("Transport error: {message}")]
    Transport {
        /// Detailed error message
        message: String,
    },

    /// Error payloads returned by a provider (HTTP 4xx, malformed body)
    #[error("Provider error: {message}")]
    Provider {
        /// Detailed error message
        message: String,
    },

    /// Unparseable judge or rerank responses
    #[error("Parse error: {message}")]
    Parse {
        /// Detailed error message
        message: String,
    },

    /// Structured output that does not match the requested format
    #[error("Format error: {message}")]
    Format {
        /// Detailed error message
        message: String,
    },

    /// The call context was cancelled
    #[error("Operation cancelled")]
    Cancelled,

    /// The call context deadline elapsed
    #[error("Timeout: {operation}")]
    Timeout {
        /// Name of the operation that timed out
        operation: String,
    },

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal errors
    #[error("Internal error: {message}")]
    Internal {
        /// Detailed error message
        message: String,
    },

    /// Generic errors from external dependencies
    #[error("External error: {source}")]
    External {
        /// The underlying error
        #[source]
        source: anyhow::Error,
    },
}

impl RaglineError {
    /// Create a new validation error with a message.
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a new configuration error with a message.
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a new transport error with a message.
    pub fn transport<S: Into<String>>(message: S) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create a new provider error with a message.
    pub fn provider<S: Into<String>>(message: S) -> Self {
        Self::Provider {
            message: message.into(),
        }
    }

    /// Create a new parse error with a message.
    pub fn parse<S: Into<String>>(message: S) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Create a new format error with a message.
    pub fn format<S: Into<String>>(message: S) -> Self {
        Self::Format {
            message: message.into(),
        }
    }

    /// Create a new timeout error with an operation name.
    pub fn timeout<S: Into<String>>(operation: S) -> Self {
        Self::Timeout {
            operation: operation.into(),
        }
    }

    /// Create a new internal error with a message.
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Create a new external error from any error that implements `Into<anyhow::Error>`.
    pub fn external<E: Into<anyhow::Error>>(error: E) -> Self {
        Self::External {
            source: error.into(),
        }
    }

    /// Classify this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Configuration { .. } => ErrorKind::Configuration,
            Self::Transport { .. } => ErrorKind::Transport,
            Self::Provider { .. } => ErrorKind::Provider,
            Self::Parse { .. } | Self::Serialization(_) => ErrorKind::Parse,
            Self::Format { .. } => ErrorKind::Format,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Internal { .. } | Self::External { .. } => ErrorKind::Internal,
        }
    }

    /// Check if this error is retryable.
    ///
    /// Only transport failures qualify. Cancellation and deadline expiry are
    /// never retried.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    /// Check if this error was caused by the caller's input or configuration.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation { .. } | Self::Configuration { .. })
    }
}

/// Convert from `anyhow::Error` to `RaglineError`.
impl From<anyhow::Error> for RaglineError {
    fn from(error: anyhow::Error) -> Self {
        Self::External { source: error }
    }
}

/// Result type alias used throughout ragline.
pub type Result<T> = std::result::Result<T, RaglineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = RaglineError::validation("query is required");
        assert!(matches!(err, RaglineError::Validation { .. }));
        assert_eq!(err.to_string(), "Validation error: query is required");
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_error_retryable() {
        assert!(RaglineError::transport("connection reset").is_retryable());
        assert!(!RaglineError::provider("400 bad request").is_retryable());
        assert!(!RaglineError::Cancelled.is_retryable());
        assert!(!RaglineError::timeout("chat").is_retryable());
    }

    #[test]
    fn test_error_kind_display() {
        assert_eq!(ErrorKind::Cancelled.to_string(), "cancelled");
        assert_eq!(RaglineError::parse("no verdict").kind().to_string(), "parse");
    }

    #[test]
    fn test_error_client_error() {
        assert!(RaglineError::configuration("limit too small").is_client_error());
        assert!(!RaglineError::transport("network").is_client_error());
    }
}
