//! Gemini generation adapter
//!
//! Calls the generateContent REST endpoint. Credential and throttling
//! failures map to their own variants so callers can tell a bad key
//! from a transient limit.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use crate::errors::GenerateError;
use crate::generation::Generator;

const DEFAULT_MODEL: &str = "gemini-1.5-flash";
const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Generator backed by the Gemini API
pub struct GeminiGenerator {
    client: Client,
    api_key: String,
    model: String,
    identity: String,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

impl GeminiGenerator {
    pub fn new(
        api_key: String,
        model: Option<String>,
        timeout: Duration,
    ) -> Result<Self, GenerateError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GenerateError::Network(e.to_string()))?;

        let model = model.unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let identity = format!("gemini/{}", model);

        Ok(Self {
            client,
            api_key,
            model,
            identity,
            timeout,
        })
    }
}

#[async_trait]
impl Generator for GeminiGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerateError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            API_BASE, self.model, self.api_key
        );

        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenerateError::Timeout {
                        duration_ms: self.timeout.as_millis() as u64,
                    }
                } else {
                    GenerateError::Network(e.to_string())
                }
            })?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(GenerateError::Auth(format!(
                    "Gemini rejected the API key ({})",
                    response.status()
                )));
            }
            StatusCode::TOO_MANY_REQUESTS => return Err(GenerateError::RateLimited),
            status if !status.is_success() => {
                return Err(GenerateError::Network(format!(
                    "Gemini API error: {}",
                    status
                )));
            }
            _ => {}
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| GenerateError::Network(format!("Bad generateContent response: {}", e)))?;

        let text: String = parsed
            .candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| {
                c.parts
                    .iter()
                    .map(|p| p.text.as_str())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(GenerateError::EmptyResponse);
        }

        Ok(text)
    }

    fn identity(&self) -> &str {
        &self.identity
    }
}
