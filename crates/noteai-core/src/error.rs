//! Error handling for NoteAI
//!
//! Defines the closed error taxonomy surfaced to callers, the raw error type
//! produced by providers, and the message-based classifier between them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Closed set of failure categories a caller of the generation client can observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    InvalidCredentials,
    QuotaExceeded,
    Timeout,
    ContentFiltered,
    NetworkError,
    Unknown,
}

impl ErrorKind {
    /// Only credential and content-safety failures are permanent.
    pub fn is_retryable(self) -> bool {
        !matches!(self, ErrorKind::InvalidCredentials | ErrorKind::ContentFiltered)
    }

    /// Stable machine-readable code, used in logs and CLI output.
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::InvalidCredentials => "API_KEY_INVALID",
            ErrorKind::QuotaExceeded => "QUOTA_EXCEEDED",
            ErrorKind::Timeout => "TIMEOUT",
            ErrorKind::ContentFiltered => "CONTENT_FILTERED",
            ErrorKind::NetworkError => "NETWORK_ERROR",
            ErrorKind::Unknown => "UNKNOWN",
        }
    }

    fn canonical_message(self) -> Option<&'static str> {
        match self {
            ErrorKind::InvalidCredentials => Some("Invalid API key"),
            ErrorKind::QuotaExceeded => Some("API quota exceeded"),
            ErrorKind::Timeout => Some("Request timeout"),
            ErrorKind::ContentFiltered => Some("Content filtered by safety policy"),
            ErrorKind::NetworkError => Some("Network error"),
            ErrorKind::Unknown => None,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// Upstream errors are unstructured; first matching group wins.
const CLASSIFICATION_RULES: &[(ErrorKind, &[&str])] = &[
    (ErrorKind::InvalidCredentials, &["api key", "authentication"]),
    (ErrorKind::QuotaExceeded, &["quota", "rate limit"]),
    (ErrorKind::Timeout, &["timeout", "timed out"]),
    (ErrorKind::ContentFiltered, &["content policy", "safety"]),
    (ErrorKind::NetworkError, &["network", "connection"]),
];

/// Classify an upstream error message into an [`ErrorKind`].
///
/// Matching is case-insensitive and follows a fixed precedence: credentials,
/// quota, timeout, content safety, network. Anything else is `Unknown`.
pub fn classify_message(message: &str) -> ErrorKind {
    let lowered = message.to_lowercase();
    CLASSIFICATION_RULES
        .iter()
        .find(|(_, needles)| needles.iter().any(|needle| lowered.contains(needle)))
        .map(|(kind, _)| *kind)
        .unwrap_or(ErrorKind::Unknown)
}

/// A failure normalized into the [`ErrorKind`] taxonomy.
///
/// The original failure is kept as the error source for diagnostics.
#[derive(Error, Debug, Clone)]
#[error("{kind}: {message}")]
pub struct GenerationError {
    kind: ErrorKind,
    message: String,
    #[source]
    cause: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl GenerationError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            cause: None,
        }
    }

    pub fn with_cause(
        mut self,
        cause: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        self.cause = Some(Arc::from(cause.into()));
        self
    }

    /// Normalize an arbitrary failure.
    ///
    /// A value that already is a `GenerationError` is returned unchanged, so
    /// classifying twice is a no-op.
    pub fn classify(error: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        let boxed = error.into();
        let boxed = match boxed.downcast::<GenerationError>() {
            Ok(classified) => return *classified,
            Err(other) => other,
        };

        let original = boxed.to_string();
        let kind = classify_message(&original);
        let message = kind
            .canonical_message()
            .map(str::to_string)
            .unwrap_or(original);

        Self {
            kind,
            message,
            cause: Some(Arc::from(boxed)),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    pub fn cause(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        self.cause.as_deref()
    }
}

/// Raw failure reported by a text-generation provider.
///
/// The display text is what [`classify_message`] inspects, so each variant
/// carries the upstream wording where there is one.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("request timeout after {0} ms")]
    Timeout(u64),

    #[error("network connection failed: {0}")]
    Connection(String),

    #[error("response blocked by safety filter: {0}")]
    Blocked(String),

    #[error("malformed provider response: {0}")]
    Decode(String),

    #[error("{0}")]
    Other(String),
}

/// Configuration errors, raised when a client is constructed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is required")]
    MissingApiKey(&'static str),

    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}
