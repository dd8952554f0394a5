//! Unified error types for eventscout.
//!
//! This module provides the error hierarchy covering:
//! - LLM provider errors (authentication, rate limiting, etc.)
//! - Tool execution errors
//! - Search invocation errors (invalid input, upstream failures, contract violations)
//! - Tracing client errors

use std::fmt;

/// Result type alias for eventscout operations.
pub type Result<T> = std::result::Result<T, Error>;

/// A boxed, thread-safe error used at the external collaborator seams.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The main error type for eventscout.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// LLM provider error.
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// Search invocation error.
    #[error(transparent)]
    Search(#[from] SearchError),

    /// Tracing client error.
    #[error("Trace error: {0}")]
    Trace(#[from] TraceError),

    /// Missing or invalid configuration.
    #[error("{0}")]
    Config(String),

    /// Runner error.
    #[error("{0}")]
    Run(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Create a configuration error with a message.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a runner error with a message.
    #[must_use]
    pub fn run(msg: impl Into<String>) -> Self {
        Self::Run(msg.into())
    }
}

/// Errors produced while building or executing a search.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SearchError {
    /// Empty query-building input; raised before any external call.
    #[error("{0}")]
    InvalidArgument(String),

    /// The search capability itself failed.
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    /// The search capability returned something other than a string.
    #[error("{0}")]
    ContractViolation(String),

    /// The tracing collaborator failed while recording the call.
    #[error(transparent)]
    Trace(#[from] TraceError),
}

impl SearchError {
    /// Create an invalid argument error.
    #[must_use]
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create a contract violation error.
    #[must_use]
    pub fn contract_violation(msg: impl Into<String>) -> Self {
        Self::ContractViolation(msg.into())
    }
}

/// Failure reported by the search capability.
///
/// When the capability failed with a structured error, that error is kept as
/// the [`source`](std::error::Error::source) and its message is reused
/// verbatim. Opaque failures carry only the synthesized message.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct UpstreamError {
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl UpstreamError {
    /// Wrap a structured failure, preserving its message.
    #[must_use]
    pub fn structured(source: BoxError) -> Self {
        Self {
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Create an upstream error from a bare message.
    #[must_use]
    pub fn opaque(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Returns the error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns `true` if the underlying failure was a structured error.
    #[must_use]
    pub const fn is_structured(&self) -> bool {
        self.source.is_some()
    }

    /// Consume the error and return the original structured failure, if any.
    #[must_use]
    pub fn into_source(self) -> Option<BoxError> {
        self.source
    }
}

/// Errors raised by a tracing client.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum TraceError {
    /// The client rejected an operation.
    #[error("{0}")]
    Client(String),

    /// The ingestion endpoint answered with a non-success status.
    #[error("ingestion rejected with HTTP {status}: {body}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl TraceError {
    /// Create a client error with a message.
    #[must_use]
    pub fn client(msg: impl Into<String>) -> Self {
        Self::Client(msg.into())
    }
}

/// Error type for LLM provider operations.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct LlmError {
    /// The error kind.
    pub kind: LlmErrorKind,
    /// The provider name (e.g., "gemini").
    pub provider: Option<String>,
    /// Additional error message.
    pub message: String,
    /// Optional error code from the provider.
    pub code: Option<String>,
}

/// Categories of LLM errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum LlmErrorKind {
    /// Authentication or authorization failure.
    Auth,
    /// Rate limit exceeded.
    RateLimited,
    /// Response format error.
    ResponseFormat,
    /// Network or connection error.
    Network,
    /// HTTP status error.
    HttpStatus,
    /// Provider-specific error.
    Provider,
    /// Internal error.
    Internal,
}

impl LlmError {
    const fn with_kind(kind: LlmErrorKind, provider: Option<String>, message: String) -> Self {
        Self {
            kind,
            provider,
            message,
            code: None,
        }
    }

    /// Create an authentication error.
    #[must_use]
    pub fn auth(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_kind(LlmErrorKind::Auth, Some(provider.into()), message.into())
    }

    /// Create a rate limit error.
    #[must_use]
    pub fn rate_limited(provider: impl Into<String>) -> Self {
        Self::with_kind(
            LlmErrorKind::RateLimited,
            Some(provider.into()),
            "Rate limit exceeded. Please retry after some time.".into(),
        )
    }

    /// Create a response format error.
    #[must_use]
    pub fn response_format(expected: impl Into<String>, got: impl Into<String>) -> Self {
        Self::with_kind(
            LlmErrorKind::ResponseFormat,
            None,
            format!("Expected {}, got {}", expected.into(), got.into()),
        )
    }

    /// Create a network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::with_kind(LlmErrorKind::Network, None, message.into())
    }

    /// Create an HTTP status error.
    #[must_use]
    pub fn http_status(status: u16, body: impl Into<String>) -> Self {
        Self {
            code: Some(status.to_string()),
            ..Self::with_kind(
                LlmErrorKind::HttpStatus,
                None,
                format!("HTTP {status}: {}", body.into()),
            )
        }
    }

    /// Create a provider error with an error code.
    #[must_use]
    pub fn provider_code(
        provider: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code: Some(code.into()),
            ..Self::with_kind(LlmErrorKind::Provider, Some(provider.into()), message.into())
        }
    }

    /// Create an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::with_kind(LlmErrorKind::Internal, None, message.into())
    }
}

impl fmt::Display for LlmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(provider) = &self.provider {
            write!(f, "[{provider}] ")?;
        }
        write!(f, "{}", self.message)?;
        if let Some(code) = &self.code {
            write!(f, " (code: {code})")?;
        }
        Ok(())
    }
}

impl std::error::Error for LlmError {}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::network("Request timed out")
        } else if err.is_connect() {
            Self::network(format!("Connection failed: {err}"))
        } else {
            Self::network(err.to_string())
        }
    }
}
