//! NoteAI generation client
//!
//! [`GenerationClient`] validates token budgets, retries transient provider
//! failures and reports one [`UsageLogRecord`](noteai_core::UsageLogRecord)
//! per call. [`NoteAssistant`] builds note summaries and tags on top of it.

pub mod client;
pub mod notes;
#[cfg(feature = "redis")]
pub mod telemetry;
pub mod usage;

pub use client::{
    GenerationClient, TextStream, HEALTH_CHECK_PROMPT, STREAM_CANCELLED_MESSAGE,
    TOKEN_LIMIT_MESSAGE,
};
pub use notes::{
    parse_tags, validate_tags, NoteAiError, NoteAssistant, NoteSummary, NoteTags,
    MAX_TAGS, MAX_TAG_CHARS, MIN_CONTENT_CHARS,
};
#[cfg(feature = "redis")]
pub use telemetry::RedisUsageSink;
pub use usage::{MemoryUsageSink, TracingUsageSink, UsageSink, USAGE_TARGET};

pub use noteai_core::{
    ErrorKind, GenerationConfig, GenerationError, GenerationRequest, GenerationResponse,
    HealthCheckResult, Usage, UsageLogRecord,
};
