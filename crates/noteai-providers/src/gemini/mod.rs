//! Google Gemini REST adapter.

mod client;
mod streaming;
mod types;

pub use client::{GeminiProvider, BASE_URL_VAR, DEFAULT_BASE_URL};
