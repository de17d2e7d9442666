use std::time::Duration;

use async_trait::async_trait;
use core_config::{ConfigError, FromEnv, env_or_default};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::provider::{EmbeddingClient, EmbeddingError};

const DEFAULT_SERVICE_URL: &str = "http://localhost:5001";
const DEFAULT_DIMENSION: &str = "384";
const DEFAULT_TIMEOUT_SECS: &str = "10";

/// Configuration for the HTTP embedding provider.
#[derive(Clone, Debug)]
pub struct EmbeddingConfig {
    /// Base URL of the provider; requests go to `{base_url}/embed`
    pub base_url: String,
    /// Expected vector dimension; mismatched responses are rejected
    pub dimension: usize,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SERVICE_URL.to_string(),
            dimension: 384,
            timeout_secs: 10,
        }
    }
}

/// Environment variables:
/// - `EMBEDDING_SERVICE_URL` (optional, default: http://localhost:5001)
/// - `EMBEDDING_DIMENSION` (optional, default: 384)
/// - `EMBEDDING_TIMEOUT_SECS` (optional, default: 10)
impl FromEnv for EmbeddingConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let parse_err = |key: &str, e: &dyn std::fmt::Display| ConfigError::ParseError {
            key: key.to_string(),
            details: format!("{}", e),
        };

        Ok(Self {
            base_url: env_or_default("EMBEDDING_SERVICE_URL", DEFAULT_SERVICE_URL),
            dimension: env_or_default("EMBEDDING_DIMENSION", DEFAULT_DIMENSION)
                .parse()
                .map_err(|e: std::num::ParseIntError| parse_err("EMBEDDING_DIMENSION", &e))?,
            timeout_secs: env_or_default("EMBEDDING_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)
                .parse()
                .map_err(|e: std::num::ParseIntError| parse_err("EMBEDDING_TIMEOUT_SECS", &e))?,
        })
    }
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

/// Embedding provider backed by an external HTTP service.
///
/// No retries: a failed or slow request surfaces as
/// [`EmbeddingError::Unavailable`] within the configured timeout.
#[derive(Clone)]
pub struct HttpEmbeddingClient {
    client: reqwest::Client,
    config: EmbeddingConfig,
}

impl HttpEmbeddingClient {
    pub fn new(config: EmbeddingConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self::new(EmbeddingConfig::from_env()?))
    }
}

#[async_trait]
impl EmbeddingClient for HttpEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let url = format!("{}/embed", self.config.base_url.trim_end_matches('/'));
        debug!(url = %url, chars = text.len(), "Requesting embedding");

        let response = self
            .client
            .post(&url)
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .json(&EmbedRequest { text })
            .send()
            .await
            .map_err(|e| EmbeddingError::Unavailable(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Unavailable(format!(
                "provider returned {}: {}",
                status, body
            )));
        }

        let parsed: EmbedResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::Unavailable(format!("invalid response body: {}", e)))?;

        if parsed.embedding.len() != self.config.dimension {
            return Err(EmbeddingError::Unavailable(format!(
                "expected {} dimensions, got {}",
                self.config.dimension,
                parsed.embedding.len()
            )));
        }

        Ok(parsed.embedding)
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }
}
