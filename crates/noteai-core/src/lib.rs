//! Core types, traits, and error handling for NoteAI
//!
//! This crate contains the generation data model, configuration, the error
//! taxonomy and classifier, token budgeting and the retry executor shared by
//! the provider adapters and the generation client.

pub mod config;
pub mod error;
pub mod retry;
pub mod tokens;
pub mod traits;
pub mod types;

// Re-exports for convenient access
pub use config::GenerationConfig;
pub use error::{classify_message, ConfigError, ErrorKind, GenerationError, ProviderError};
pub use retry::{with_retry, RetryPolicy};
pub use tokens::{
    estimate_tokens, validate_default_token_limit, validate_token_limit, DEFAULT_MAX_TOKENS,
    RESERVED_TOKENS,
};
pub use traits::{ChunkStream, TextProvider};
pub use types::{
    GenerationParams, GenerationRequest, GenerationResponse, HealthCheckResult, ProviderResponse,
    Usage, UsageLogRecord,
};

#[cfg(any(test, feature = "test-mocks"))]
pub use traits::MockTextProvider;
