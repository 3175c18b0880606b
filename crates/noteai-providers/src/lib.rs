//! Provider adapters for NoteAI
//!
//! Each adapter implements [`noteai_core::TextProvider`] over a concrete
//! network API.

#[cfg(feature = "gemini")]
pub mod gemini;

#[cfg(feature = "gemini")]
pub use gemini::{GeminiProvider, DEFAULT_BASE_URL};
