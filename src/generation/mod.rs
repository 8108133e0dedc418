//! Generation capability
//!
//! `Generator` calls an external language model with the assembled
//! prompt. Providers are swappable behind the trait; failures are typed,
//! never an empty string.

pub mod gemini;
pub mod ollama;

pub use gemini::GeminiGenerator;
pub use ollama::OllamaGenerator;

use async_trait::async_trait;

use crate::errors::GenerateError;

/// Produces an answer from a fully assembled prompt
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerateError>;

    /// Stable provider/model tag for display and diagnostics
    fn identity(&self) -> &str;
}
