//! Note summaries and tag suggestions

use noteai_core::{
    estimate_tokens, validate_default_token_limit, GenerationError, GenerationRequest, Usage,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::client::GenerationClient;

/// Minimum note length, in characters, for summaries and tags.
pub const MIN_CONTENT_CHARS: usize = 100;
pub const MAX_TAGS: usize = 6;
pub const MAX_TAG_CHARS: usize = 50;

const NOTE_MAX_TOKENS: u32 = 500;
const NOTE_TEMPERATURE: f64 = 0.7;

const SUMMARY_PROMPT: &str = "\
Analyze the following note and summarize its core content.
Write the summary in 3-5 sentences and include the note's main points and conclusion.

Note:
{noteContent}

Summary:
";

const TAG_PROMPT: &str = "\
Analyze the following note and generate up to 6 highly relevant tags.
Write the tags in the note's language and reflect its core topics and keywords.

Note:
{noteContent}

Tags (comma separated):
";

#[derive(Error, Debug, Clone)]
pub enum NoteAiError {
    #[error("note content must be at least 100 characters (got {0})")]
    ContentTooShort(usize),

    #[error("note is too long to process ({0} estimated tokens)")]
    ContentTooLong(u32),

    #[error("no tags could be parsed from the response")]
    NoTags,

    #[error("invalid tag {0:?}: tags must be 1-50 characters")]
    InvalidTag(String),

    #[error(transparent)]
    Generation(#[from] GenerationError),
}

impl NoteAiError {
    /// Machine-readable code; generation failures use their kind's code.
    pub fn code(&self) -> &'static str {
        match self {
            NoteAiError::ContentTooShort(_) => "CONTENT_TOO_SHORT",
            NoteAiError::ContentTooLong(_) => "CONTENT_TOO_LONG",
            NoteAiError::NoTags => "NO_TAGS",
            NoteAiError::InvalidTag(_) => "INVALID_TAG",
            NoteAiError::Generation(e) => e.kind().code(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteSummary {
    pub text: String,
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteTags {
    pub tags: Vec<String>,
    pub usage: Option<Usage>,
}

/// Generates summaries and tags for note content.
#[derive(Debug, Clone)]
pub struct NoteAssistant {
    client: GenerationClient,
}

impl NoteAssistant {
    pub fn new(client: GenerationClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &GenerationClient {
        &self.client
    }

    pub async fn summarize(&self, content: &str) -> Result<NoteSummary, NoteAiError> {
        check_content(content)?;
        let response = self.generate(SUMMARY_PROMPT, content).await?;
        debug!(chars = response.text.len(), "summary generated");

        Ok(NoteSummary {
            text: response.text.trim().to_string(),
            usage: response.usage,
        })
    }

    pub async fn generate_tags(&self, content: &str) -> Result<NoteTags, NoteAiError> {
        check_content(content)?;
        let response = self.generate(TAG_PROMPT, content).await?;

        let tags = parse_tags(&response.text);
        if tags.is_empty() {
            return Err(NoteAiError::NoTags);
        }
        debug!(count = tags.len(), "tags generated");

        Ok(NoteTags {
            tags,
            usage: response.usage,
        })
    }

    async fn generate(
        &self,
        template: &str,
        content: &str,
    ) -> Result<noteai_core::GenerationResponse, GenerationError> {
        let request = GenerationRequest::new(template.replace("{noteContent}", content))
            .with_max_tokens(NOTE_MAX_TOKENS)
            .with_temperature(NOTE_TEMPERATURE);
        self.client.generate_text(&request).await
    }
}

fn check_content(content: &str) -> Result<(), NoteAiError> {
    let chars = content.chars().count();
    if chars < MIN_CONTENT_CHARS {
        return Err(NoteAiError::ContentTooShort(chars));
    }
    let tokens = estimate_tokens(content);
    if !validate_default_token_limit(tokens) {
        return Err(NoteAiError::ContentTooLong(tokens));
    }
    Ok(())
}

/// Split a comma separated model reply into at most [`MAX_TAGS`] tags.
pub fn parse_tags(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .take(MAX_TAGS)
        .map(str::to_string)
        .collect()
}

/// Trim user-supplied tags and check each is 1 to [`MAX_TAG_CHARS`] characters.
pub fn validate_tags<S: AsRef<str>>(tags: &[S]) -> Result<Vec<String>, NoteAiError> {
    tags.iter()
        .map(|tag| {
            let tag = tag.as_ref().trim();
            let chars = tag.chars().count();
            if chars == 0 || chars > MAX_TAG_CHARS {
                Err(NoteAiError::InvalidTag(tag.to_string()))
            } else {
                Ok(tag.to_string())
            }
        })
        .collect()
}
