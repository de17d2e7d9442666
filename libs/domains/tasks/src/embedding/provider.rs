use async_trait::async_trait;
use thiserror::Error;

/// Failure talking to the embedding provider.
///
/// Deliberately opaque: callers decide policy (fail hard vs. degrade), they
/// never branch on the cause.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding provider unavailable: {0}")]
    Unavailable(String),
}

/// A provider that turns text into a fixed-dimension embedding vector.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Embed a single piece of text. Returns a vector of exactly
    /// `dimension()` components.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Dimension of vectors produced by this provider.
    fn dimension(&self) -> usize;
}
