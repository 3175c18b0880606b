mod provider;

pub use provider::{ChunkStream, TextProvider};

#[cfg(any(test, feature = "test-mocks"))]
pub use provider::MockTextProvider;
