//! Ollama embedding adapter
//!
//! Calls POST /api/embeddings on a local Ollama instance. Default model
//! is nomic-embed-text (768 dimensions).

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use crate::embedding::Embedder;
use crate::errors::EmbedError;

const DEFAULT_MODEL: &str = "nomic-embed-text";
const DEFAULT_DIMENSION: usize = 768;

/// Conservative input cap; nomic-embed-text truncates past its context
/// window, so reject earlier with a typed error instead
const MAX_INPUT_CHARS: usize = 32_000;

/// HTTP embedder backed by a local Ollama instance
pub struct OllamaEmbedder {
    client: Client,
    base_url: String,
    model: String,
    dimension: usize,
    identity: String,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    embedding: Vec<f32>,
}

impl OllamaEmbedder {
    /// Create a new embedder
    ///
    /// # Arguments
    /// * `base_url` - Base URL for the Ollama API (default: http://127.0.0.1:11434)
    /// * `model` - Embedding model name (default: nomic-embed-text)
    pub fn new(base_url: Option<String>, model: Option<String>) -> Result<Self, EmbedError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| EmbedError::ModelUnavailable(e.to_string()))?;

        let model = model.unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let identity = format!("ollama/{}", model);

        Ok(Self {
            client,
            base_url: base_url.unwrap_or_else(|| "http://127.0.0.1:11434".to_string()),
            model,
            dimension: DEFAULT_DIMENSION,
            identity,
        })
    }

    /// Override the expected vector dimension for non-default models
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension;
        self
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let chars = text.chars().count();
        if chars > MAX_INPUT_CHARS {
            return Err(EmbedError::InputTooLong {
                chars,
                max: MAX_INPUT_CHARS,
            });
        }

        let url = format!("{}/api/embeddings", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&json!({ "model": self.model, "prompt": text }))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    EmbedError::Timeout {
                        duration_ms: 120_000,
                    }
                } else {
                    EmbedError::ModelUnavailable(format!("Failed to reach Ollama: {}", e))
                }
            })?;

        if !response.status().is_success() {
            return Err(EmbedError::ModelUnavailable(format!(
                "Ollama API error: {}",
                response.status()
            )));
        }

        let parsed: EmbeddingsResponse = response
            .json()
            .await
            .map_err(|e| EmbedError::ModelUnavailable(format!("Bad embeddings response: {}", e)))?;

        if parsed.embedding.len() != self.dimension {
            return Err(EmbedError::ModelUnavailable(format!(
                "Model returned dimension {} but {} was expected",
                parsed.embedding.len(),
                self.dimension
            )));
        }

        Ok(parsed.embedding)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn identity(&self) -> &str {
        &self.identity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_includes_model_name() {
        let embedder = OllamaEmbedder::new(None, Some("all-minilm".to_string())).unwrap();
        assert_eq!(embedder.identity(), "ollama/all-minilm");
    }

    #[test]
    fn test_default_dimension() {
        let embedder = OllamaEmbedder::new(None, None).unwrap();
        assert_eq!(embedder.dimension(), 768);
    }

    #[test]
    fn test_dimension_override() {
        let embedder = OllamaEmbedder::new(None, Some("all-minilm".to_string()))
            .unwrap()
            .with_dimension(384);
        assert_eq!(embedder.dimension(), 384);
    }

    #[tokio::test]
    async fn test_oversize_input_rejected_before_network() {
        // Unroutable URL proves the length check fires first
        let embedder =
            OllamaEmbedder::new(Some("http://192.0.2.1:1".to_string()), None).unwrap();
        let big = "x".repeat(MAX_INPUT_CHARS + 1);

        let err = embedder.embed(&big).await.unwrap_err();
        assert!(matches!(err, EmbedError::InputTooLong { .. }));
    }
}
