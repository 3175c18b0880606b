//! Wire types for the Gemini `generateContent` API.

use noteai_core::{GenerationParams, ProviderError, ProviderResponse};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateContentRequest<'a> {
    pub contents: Vec<Content<'a>>,
    pub generation_config: GenerationConfig,
}

impl<'a> GenerateContentRequest<'a> {
    pub fn new(prompt: &'a str, params: &GenerationParams) -> Self {
        Self {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: params.max_output_tokens,
                temperature: params.temperature,
                top_p: params.top_p,
                top_k: params.top_k,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct Content<'a> {
    pub role: &'static str,
    pub parts: Vec<Part<'a>>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct Part<'a> {
    pub text: &'a str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerationConfig {
    pub max_output_tokens: u32,
    pub temperature: f64,
    pub top_p: f64,
    pub top_k: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    pub prompt_feedback: Option<PromptFeedback>,
    /// Set when an SSE event reports a failure after the stream opened.
    pub error: Option<ErrorBody>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Candidate {
    pub content: Option<CandidateContent>,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<CandidatePart>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CandidatePart {
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PromptFeedback {
    pub block_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorBody {
    pub code: Option<u16>,
    #[serde(default)]
    pub message: String,
    pub status: Option<String>,
}

impl ErrorBody {
    /// Upstream message, suffixed with the status name when it adds anything.
    fn describe(self) -> String {
        match self.status {
            Some(status) if !self.message.contains(&status) => {
                format!("{} ({})", self.message, status)
            }
            _ => self.message,
        }
    }

    /// Error for an envelope that arrived with a 2xx status.
    pub fn into_provider_error(self) -> ProviderError {
        let status = self.code.unwrap_or(500);
        ProviderError::Api {
            status,
            message: self.describe(),
        }
    }
}

const SAFETY_FINISH: &str = "SAFETY";

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate.
    pub fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }

    pub fn finish_reason(&self) -> Option<&str> {
        self.candidates.first().and_then(|c| c.finish_reason.as_deref())
    }

    /// The reason the prompt or candidate was blocked, if the payload carries no usable text.
    pub fn block_reason(&self, text: &str) -> Option<String> {
        if self.candidates.is_empty() {
            if let Some(reason) = self
                .prompt_feedback
                .as_ref()
                .and_then(|f| f.block_reason.clone())
            {
                return Some(reason);
            }
        }
        match self.finish_reason() {
            Some(SAFETY_FINISH) if text.is_empty() => Some(SAFETY_FINISH.to_string()),
            _ => None,
        }
    }

    pub fn into_provider_response(self) -> Result<ProviderResponse, ProviderError> {
        if let Some(error) = self.error {
            return Err(error.into_provider_error());
        }
        let text = self.text();
        if let Some(reason) = self.block_reason(&text) {
            return Err(ProviderError::Blocked(reason));
        }
        Ok(ProviderResponse {
            text,
            finish_reason: self.finish_reason().map(str::to_string),
        })
    }
}

/// Turn a non-2xx body into an API error, keeping the upstream message when it parses.
pub(crate) fn api_error(status: u16, body: &str) -> ProviderError {
    let message = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => envelope.error.describe(),
        Err(_) => body.trim().to_string(),
    };
    ProviderError::Api { status, message }
}
