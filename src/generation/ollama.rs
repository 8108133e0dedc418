//! Ollama generation adapter
//!
//! Calls POST /api/generate with stream=false against a local Ollama
//! instance for fully offline question answering.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use crate::errors::GenerateError;
use crate::generation::Generator;

const DEFAULT_MODEL: &str = "gemma3:4b";

/// Generator backed by a local Ollama instance
pub struct OllamaGenerator {
    client: Client,
    base_url: String,
    model: String,
    identity: String,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

impl OllamaGenerator {
    pub fn new(
        base_url: Option<String>,
        model: Option<String>,
        timeout: Duration,
    ) -> Result<Self, GenerateError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GenerateError::Network(e.to_string()))?;

        let model = model.unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let identity = format!("ollama/{}", model);

        Ok(Self {
            client,
            base_url: base_url.unwrap_or_else(|| "http://127.0.0.1:11434".to_string()),
            model,
            identity,
            timeout,
        })
    }
}

#[async_trait]
impl Generator for OllamaGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerateError> {
        let url = format!("{}/api/generate", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&json!({
                "model": self.model,
                "prompt": prompt,
                "stream": false
            }))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenerateError::Timeout {
                        duration_ms: self.timeout.as_millis() as u64,
                    }
                } else {
                    GenerateError::Network(format!("Failed to reach Ollama: {}", e))
                }
            })?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(GenerateError::RateLimited);
        }
        if !status.is_success() {
            return Err(GenerateError::Network(format!(
                "Ollama API error: {}",
                status
            )));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| GenerateError::Network(format!("Bad generate response: {}", e)))?;

        if parsed.response.trim().is_empty() {
            return Err(GenerateError::EmptyResponse);
        }

        Ok(parsed.response)
    }

    fn identity(&self) -> &str {
        &self.identity
    }
}
