use async_trait::async_trait;
use futures_util::stream::BoxStream;

use crate::error::ProviderError;
use crate::types::{GenerationParams, ProviderResponse};

/// Partial-text chunks of a streamed generation, in arrival order.
pub type ChunkStream = BoxStream<'static, Result<String, ProviderError>>;

/// A text-generation backend reachable over the network.
///
/// Implementations report raw failures as [`ProviderError`]; classification
/// and retry happen in the caller.
#[cfg_attr(any(test, feature = "test-mocks"), mockall::automock)]
#[async_trait]
pub trait TextProvider: Send + Sync + 'static {
    async fn generate(
        &self,
        prompt: &str,
        model: &str,
        params: &GenerationParams,
    ) -> Result<ProviderResponse, ProviderError>;

    async fn generate_stream(
        &self,
        prompt: &str,
        model: &str,
        params: &GenerationParams,
    ) -> Result<ChunkStream, ProviderError>;
}
