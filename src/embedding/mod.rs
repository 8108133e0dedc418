//! Embedding capability
//!
//! `Embedder` maps text to a fixed-dimension vector. The dimension and
//! model identity are fixed for the lifetime of one instance so every
//! vector placed in one index is comparable, and so a persisted index
//! can detect that it was built by a different model.

pub mod ollama;

pub use ollama::OllamaEmbedder;

use async_trait::async_trait;

use crate::errors::EmbedError;

/// Maps text to a fixed-dimension embedding vector
///
/// Calls are potentially high-latency and must be independently
/// awaitable per chunk. The same (identity, text) pair yields the same
/// vector, which keeps results cacheable.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed one text into a vector of exactly `dimension()` floats
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError>;

    /// Vector dimension, fixed per instance
    fn dimension(&self) -> usize;

    /// Stable model identity tag (e.g. "ollama/nomic-embed-text")
    fn identity(&self) -> &str;
}
