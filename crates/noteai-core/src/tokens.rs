//! Token budgeting
//!
//! Token counts are approximated from character length (about four characters
//! per token). The estimate is a heuristic used to reject oversized prompts
//! before they reach the network, not an exact tokenizer.

/// Default combined budget for input plus reserved output.
pub const DEFAULT_MAX_TOKENS: u32 = 8192;

/// Headroom kept free for the response.
pub const RESERVED_TOKENS: u32 = 2000;

const CHARS_PER_TOKEN: usize = 4;

/// Estimate the token count of `text` as `ceil(chars / 4)`.
pub fn estimate_tokens(text: &str) -> u32 {
    let chars = text.chars().count();
    u32::try_from(chars.div_ceil(CHARS_PER_TOKEN)).unwrap_or(u32::MAX)
}

/// True iff `input_tokens` fits in `max_tokens` after reserving response headroom.
///
/// A budget smaller than the reserve admits nothing.
pub fn validate_token_limit(input_tokens: u32, max_tokens: u32) -> bool {
    i64::from(input_tokens) <= i64::from(max_tokens) - i64::from(RESERVED_TOKENS)
}

/// [`validate_token_limit`] against [`DEFAULT_MAX_TOKENS`].
pub fn validate_default_token_limit(input_tokens: u32) -> bool {
    validate_token_limit(input_tokens, DEFAULT_MAX_TOKENS)
}
