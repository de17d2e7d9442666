//! Embedding provider abstraction and the HTTP client implementation.

pub mod http;
pub mod provider;

pub use http::{EmbeddingConfig, HttpEmbeddingClient};
pub use provider::{EmbeddingClient, EmbeddingError};

#[cfg(test)]
pub use provider::MockEmbeddingClient;
