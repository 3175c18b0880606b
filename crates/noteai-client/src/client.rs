use futures::stream::BoxStream;
use futures::StreamExt;
use noteai_core::{
    estimate_tokens, validate_token_limit, ChunkStream, ErrorKind, GenerationConfig,
    GenerationError, GenerationParams, GenerationRequest, GenerationResponse, HealthCheckResult,
    ProviderError, RetryPolicy, TextProvider, Usage, UsageLogRecord,
};
use noteai_providers::GeminiProvider;
use std::future::Future;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, error};

use crate::usage::{TracingUsageSink, UsageSink};

/// Prompt used by [`GenerationClient::health_check`].
pub const HEALTH_CHECK_PROMPT: &str = "Hello";

pub const TOKEN_LIMIT_MESSAGE: &str = "Input text exceeds token limit";

/// Usage error recorded for a stream dropped before it finished.
pub const STREAM_CANCELLED_MESSAGE: &str = "Stream cancelled";

/// Text chunks of a streamed generation.
pub type TextStream = BoxStream<'static, Result<String, GenerationError>>;

/// Façade over a [`TextProvider`].
///
/// Holds only shared immutable state, so clones are cheap and calls may run
/// concurrently.
#[derive(Clone)]
pub struct GenerationClient {
    config: Arc<GenerationConfig>,
    provider: Arc<dyn TextProvider>,
    usage: Arc<dyn UsageSink>,
    retry: RetryPolicy,
}

impl std::fmt::Debug for GenerationClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationClient")
            .field("config", &self.config)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl GenerationClient {
    pub fn new(config: GenerationConfig, provider: Arc<dyn TextProvider>) -> Self {
        let usage = Arc::new(TracingUsageSink::new(config.debug()));
        Self {
            config: Arc::new(config),
            provider,
            usage,
            retry: RetryPolicy::default(),
        }
    }

    /// Client backed by the Gemini REST API.
    pub fn gemini(config: GenerationConfig) -> Result<Self, GenerationError> {
        let provider = GeminiProvider::from_config(&config).map_err(GenerationError::classify)?;
        Ok(Self::new(config, Arc::new(provider)))
    }

    pub fn with_usage_sink(mut self, usage: Arc<dyn UsageSink>) -> Self {
        self.usage = usage;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Probe the provider with a trivial prompt. Never fails.
    pub async fn health_check(&self) -> HealthCheckResult {
        let started = Instant::now();
        let result = self
            .generate_text(&GenerationRequest::new(HEALTH_CHECK_PROMPT))
            .await;
        let latency_ms = elapsed_ms(started);

        match result {
            Ok(response) => HealthCheckResult {
                is_healthy: !response.text.is_empty(),
                latency_ms,
                error: None,
            },
            Err(e) => {
                error!(kind = %e.kind(), latency_ms, "health check failed: {}", e);
                HealthCheckResult {
                    is_healthy: false,
                    latency_ms,
                    error: Some(e.message().to_string()),
                }
            }
        }
    }

    pub async fn generate_text(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, GenerationError> {
        let started = Instant::now();
        let input_tokens = self.check_budget(request, started)?;
        let params = GenerationParams::resolve(request, self.config.max_tokens());

        debug!(model = self.config.model(), input_tokens, "calling provider");
        let result = self
            .retry
            .run(|| {
                self.bounded(
                    self.provider
                        .generate(&request.prompt, self.config.model(), &params),
                )
            })
            .await;
        let latency_ms = elapsed_ms(started);

        match result {
            Ok(response) => {
                let output_tokens = estimate_tokens(&response.text);
                debug!(input_tokens, output_tokens, latency_ms, "generation succeeded");
                self.usage.record(&UsageLogRecord::success(
                    self.config.model(),
                    input_tokens,
                    output_tokens,
                    latency_ms,
                ));
                Ok(GenerationResponse {
                    text: response.text,
                    usage: Some(Usage::new(input_tokens, output_tokens)),
                    finish_reason: response.finish_reason,
                })
            }
            Err(e) => {
                debug!(kind = %e.kind(), latency_ms, "generation failed");
                self.record_failure(input_tokens, latency_ms, &e);
                Err(e)
            }
        }
    }

    /// Stream a generation. The stream is not retried; a mid-stream failure
    /// yields one error and ends it. Dropping the stream before it ends records
    /// a failed usage entry.
    pub async fn generate_text_stream(
        &self,
        request: &GenerationRequest,
    ) -> Result<TextStream, GenerationError> {
        let started = Instant::now();
        let input_tokens = self.check_budget(request, started)?;
        let params = GenerationParams::resolve(request, self.config.max_tokens());

        debug!(model = self.config.model(), input_tokens, "opening stream");
        let opened: Result<ChunkStream, ProviderError> = self
            .bounded(
                self.provider
                    .generate_stream(&request.prompt, self.config.model(), &params),
            )
            .await;
        let mut chunks = match opened {
            Ok(chunks) => chunks,
            Err(e) => {
                let e = GenerationError::classify(e);
                self.record_failure(input_tokens, elapsed_ms(started), &e);
                return Err(e);
            }
        };

        let mut report = StreamReport {
            usage: self.usage.clone(),
            model: self.config.model().to_string(),
            input_tokens,
            started,
            recorded: false,
        };

        let stream = async_stream::stream! {
            let mut output = String::new();
            while let Some(item) = chunks.next().await {
                match item {
                    Ok(text) => {
                        output.push_str(&text);
                        yield Ok(text);
                    }
                    Err(e) => {
                        let e = GenerationError::classify(e);
                        debug!(kind = %e.kind(), "stream failed");
                        report.failure(e.message());
                        yield Err(e);
                        return;
                    }
                }
            }
            report.success(estimate_tokens(&output));
        };

        Ok(stream.boxed())
    }

    fn check_budget(
        &self,
        request: &GenerationRequest,
        started: Instant,
    ) -> Result<u32, GenerationError> {
        let input_tokens = estimate_tokens(&request.prompt);
        if validate_token_limit(input_tokens, self.config.max_tokens()) {
            return Ok(input_tokens);
        }

        debug!(
            input_tokens,
            max_tokens = self.config.max_tokens(),
            "prompt exceeds token budget"
        );
        let e = GenerationError::new(ErrorKind::QuotaExceeded, TOKEN_LIMIT_MESSAGE);
        self.record_failure(input_tokens, elapsed_ms(started), &e);
        Err(e)
    }

    /// Bound one provider attempt by the configured timeout.
    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, ProviderError>>,
    ) -> Result<T, ProviderError> {
        let timeout = self.config.timeout();
        match tokio::time::timeout(timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(timeout.as_millis() as u64)),
        }
    }

    fn record_failure(&self, input_tokens: u32, latency_ms: u64, e: &GenerationError) {
        self.usage.record(&UsageLogRecord::failure(
            self.config.model(),
            input_tokens,
            latency_ms,
            e.message(),
        ));
    }
}

/// Records exactly one usage entry for a stream, including one dropped early.
struct StreamReport {
    usage: Arc<dyn UsageSink>,
    model: String,
    input_tokens: u32,
    started: Instant,
    recorded: bool,
}

impl StreamReport {
    fn success(&mut self, output_tokens: u32) {
        self.recorded = true;
        self.usage.record(&UsageLogRecord::success(
            &self.model,
            self.input_tokens,
            output_tokens,
            elapsed_ms(self.started),
        ));
    }

    fn failure(&mut self, message: &str) {
        self.recorded = true;
        self.usage.record(&UsageLogRecord::failure(
            &self.model,
            self.input_tokens,
            elapsed_ms(self.started),
            message,
        ));
    }
}

impl Drop for StreamReport {
    fn drop(&mut self) {
        if !self.recorded {
            debug!(model = %self.model, "stream dropped before completion");
            self.failure(STREAM_CANCELLED_MESSAGE);
        }
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}
