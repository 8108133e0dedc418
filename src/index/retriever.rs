//! Retriever: query text in, ranked chunks out
//!
//! Pairs a built index with the optional embedding capability. With an
//! embedder the query is embedded (under the configured timeout) and
//! searched by cosine similarity; without one the lexical fallback runs.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use crate::embedding::Embedder;
use crate::errors::{EmbedError, Result};
use crate::index::{RetrievalResult, ScoringMode, VectorIndex};

pub struct Retriever {
    index: Arc<VectorIndex>,
    embedder: Option<Arc<dyn Embedder>>,
    top_k: usize,
    embed_timeout: Duration,
}

impl Retriever {
    pub fn new(
        index: Arc<VectorIndex>,
        embedder: Option<Arc<dyn Embedder>>,
        top_k: usize,
        embed_timeout: Duration,
    ) -> Self {
        Self {
            index,
            embedder,
            top_k,
            embed_timeout,
        }
    }

    /// Retrieve the top-k chunks for a query
    pub async fn retrieve(&self, query: &str) -> Result<RetrievalResult> {
        match (&self.embedder, self.index.mode()) {
            (Some(embedder), ScoringMode::Cosine) => {
                let vector = timeout(self.embed_timeout, embedder.embed(query))
                    .await
                    .map_err(|_| EmbedError::Timeout {
                        duration_ms: self.embed_timeout.as_millis() as u64,
                    })??;
                Ok(self.index.search(&vector, self.top_k)?)
            }
            _ => Ok(self.index.search_lexical(query, self.top_k)),
        }
    }

    pub fn index(&self) -> &Arc<VectorIndex> {
        &self.index
    }
}
