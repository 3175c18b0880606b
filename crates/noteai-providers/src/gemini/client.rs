use async_trait::async_trait;
use noteai_core::{
    ChunkStream, GenerationConfig, GenerationParams, ProviderError, ProviderResponse,
    TextProvider,
};
use reqwest::{Client, RequestBuilder, Response};
use std::time::Duration;
use tracing::debug;

use super::streaming::parse_sse_stream;
use super::types::{api_error, GenerateContentRequest, GenerateContentResponse};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Environment variable overriding [`DEFAULT_BASE_URL`].
pub const BASE_URL_VAR: &str = "GEMINI_BASE_URL";

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Gemini REST client implementing [`TextProvider`].
#[derive(Clone)]
pub struct GeminiProvider {
    client: Client,
    api_key: String,
    base_url: String,
    timeout: Duration,
}

impl std::fmt::Debug for GeminiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiProvider")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl GeminiProvider {
    /// `timeout` bounds connecting, each body read and a whole `generateContent`
    /// call. A stream is not cut off while chunks keep arriving.
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .connect_timeout(timeout)
            .read_timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Other(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout,
        })
    }

    /// Build from configuration, honouring `GEMINI_BASE_URL` when set.
    pub fn from_config(config: &GenerationConfig) -> Result<Self, ProviderError> {
        let provider = Self::new(config.api_key(), config.timeout())?;
        Ok(match std::env::var(BASE_URL_VAR) {
            Ok(url) if !url.trim().is_empty() => provider.with_base_url(url.trim()),
            _ => provider,
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, model: &str, method: &str) -> String {
        format!("{}/models/{}:{}", self.base_url, model, method)
    }

    fn request(&self, url: &str, prompt: &str, params: &GenerationParams) -> RequestBuilder {
        self.client
            .post(url)
            .header(API_KEY_HEADER, &self.api_key)
            .header("Content-Type", "application/json")
            .json(&GenerateContentRequest::new(prompt, params))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ProviderError> {
        let response = request.send().await.map_err(|e| self.map_error(e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response.text().await.unwrap_or_default();
            debug!(status, "gemini returned error status");
            return Err(api_error(status, &error_text));
        }

        Ok(response)
    }

    fn timeout_ms(&self) -> u64 {
        self.timeout.as_millis() as u64
    }

    fn map_error(&self, error: reqwest::Error) -> ProviderError {
        map_transport_error(error, self.timeout_ms())
    }
}

/// Map a reqwest failure; `timeout_ms` is the budget that a timeout exhausted.
pub(crate) fn map_transport_error(error: reqwest::Error, timeout_ms: u64) -> ProviderError {
    if error.is_timeout() {
        ProviderError::Timeout(timeout_ms)
    } else if error.is_decode() {
        ProviderError::Decode(error.to_string())
    } else if error.is_connect() || error.is_request() || error.is_body() {
        ProviderError::Connection(error.to_string())
    } else {
        ProviderError::Other(error.to_string())
    }
}

#[async_trait]
impl TextProvider for GeminiProvider {
    async fn generate(
        &self,
        prompt: &str,
        model: &str,
        params: &GenerationParams,
    ) -> Result<ProviderResponse, ProviderError> {
        let url = self.endpoint(model, "generateContent");
        debug!(model, "gemini generateContent");

        let request = self.request(&url, prompt, params).timeout(self.timeout);
        let response = self.send(request).await?;
        let data: GenerateContentResponse =
            response.json().await.map_err(|e| self.map_error(e))?;

        data.into_provider_response()
    }

    async fn generate_stream(
        &self,
        prompt: &str,
        model: &str,
        params: &GenerationParams,
    ) -> Result<ChunkStream, ProviderError> {
        let url = format!("{}?alt=sse", self.endpoint(model, "streamGenerateContent"));
        debug!(model, "gemini streamGenerateContent");

        // only opening is bounded; chunks may keep arriving past the timeout
        let request = self.request(&url, prompt, params);
        let response = tokio::time::timeout(self.timeout, self.send(request))
            .await
            .map_err(|_| ProviderError::Timeout(self.timeout_ms()))??;
        Ok(parse_sse_stream(response.bytes_stream(), self.timeout_ms()))
    }
}
