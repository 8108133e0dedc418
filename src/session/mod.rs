//! RAG session state machine
//!
//! Orchestrates load → chunk → embed → index, then answers queries
//! against the built index. The state is a tagged variant carrying the
//! index only in `Ready`/`Querying`, so "ready but no index" cannot be
//! represented. Indexing aborts on the first error and never publishes
//! a partial index; per-query errors leave the session `Ready`.

use futures_util::future::try_join_all;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, Semaphore};
use tokio::time::timeout;
use uuid::Uuid;

use crate::config::RagConfig;
use crate::document::{Chunker, DocumentLoader, DocumentSource};
use crate::embedding::Embedder;
use crate::errors::{EmbedError, GenerateError, RagError, Result, RetrievalError};
use crate::generation::Generator;
use crate::index::{IndexSnapshot, Retriever, ScoringMode, VectorIndex};
use crate::prompt::PromptBuilder;

/// Session lifecycle states
///
/// Valid transitions:
/// - Uninitialized → Indexing      (load request)
/// - Indexing      → Ready         (all chunks embedded and indexed)
/// - Indexing      → Failed        (first load/chunk/embed error)
/// - Ready         → Querying      (query accepted)
/// - Querying      → Ready         (answer or per-query error returned,
///                                  or the query was abandoned)
/// - Failed        → Indexing      (explicit reload only)
pub enum SessionState {
    Uninitialized,
    Indexing,
    Ready(Arc<VectorIndex>),
    Querying(Arc<VectorIndex>),
    Failed(RagError),
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Uninitialized => "Uninitialized",
            Self::Indexing => "Indexing",
            Self::Ready(_) => "Ready",
            Self::Querying(_) => "Querying",
            Self::Failed(_) => "Failed",
        }
    }
}

/// Answer to one query, transient per request
#[derive(Debug, Clone)]
pub struct Answer {
    pub text: String,
    /// How the supporting chunks were scored
    pub mode: ScoringMode,
    /// Chunks that survived the prompt budget
    pub chunks_used: usize,
}

/// One document, one index, one conversation
pub struct RagSession {
    id: Uuid,
    source: DocumentSource,
    loader: Arc<dyn DocumentLoader>,
    embedder: Option<Arc<dyn Embedder>>,
    generator: Arc<dyn Generator>,
    config: RagConfig,
    /// Never held across an await point
    state: Mutex<SessionState>,
    /// Serializes queries within this session; independent sessions
    /// share nothing and run concurrently
    query_gate: AsyncMutex<()>,
}

impl RagSession {
    /// Create a session in `Uninitialized`; call `load` before asking
    ///
    /// Passing no embedder selects the lexical-overlap fallback for the
    /// session's lifetime.
    pub fn new(
        source: DocumentSource,
        loader: Arc<dyn DocumentLoader>,
        embedder: Option<Arc<dyn Embedder>>,
        generator: Arc<dyn Generator>,
        config: RagConfig,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            source,
            loader,
            embedder,
            generator,
            config,
            state: Mutex::new(SessionState::Uninitialized),
            query_gate: AsyncMutex::new(()),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn source(&self) -> &DocumentSource {
        &self.source
    }

    pub fn state_name(&self) -> &'static str {
        self.lock_state().name()
    }

    pub fn is_ready(&self) -> bool {
        matches!(&*self.lock_state(), SessionState::Ready(_))
    }

    /// Load, chunk, embed and index the document
    ///
    /// Returns the chunk count on success. Any error aborts the whole
    /// attempt, moves the session to `Failed` with the cause retained,
    /// and is also returned to the caller. Calling this on a `Failed`
    /// session is the explicit reload path.
    pub async fn load(&self) -> Result<usize> {
        self.set_state(SessionState::Indexing);

        match self.index_document().await {
            Ok(index) => {
                let count = index.len();
                self.set_state(SessionState::Ready(Arc::new(index)));
                Ok(count)
            }
            Err(err) => {
                self.set_state(SessionState::Failed(err.clone()));
                Err(err)
            }
        }
    }

    /// Answer one question against the loaded document
    ///
    /// Queries within a session are serialized; a query that arrives
    /// while the session is `Indexing` or `Failed` is rejected promptly
    /// with a typed error and never enters `Querying`. Per-query errors
    /// (query embedding, retrieval, generation) are returned to this
    /// caller only; the session stays `Ready`. Dropping the returned
    /// future mid-flight restores `Ready` as if the query never ran.
    pub async fn ask(&self, query: &str) -> Result<Answer> {
        // Rejection happens before the gate so not-ready answers stay
        // prompt even while another query or a reload is in flight
        self.check_queryable()?;

        let _turn = self.query_gate.lock().await;
        let index = self.begin_query()?;
        let _guard = QueryGuard { state: &self.state };

        let retriever = Retriever::new(
            index,
            self.embedder.clone(),
            self.config.retrieval.top_k,
            self.config.embed_timeout(),
        );
        let retrieved = retriever.retrieve(query).await?;

        let prompt = PromptBuilder::new(self.config.retrieval.max_prompt_chars)
            .assemble(query, &retrieved.hits);

        let generate_timeout = self.config.generate_timeout();
        let text = timeout(generate_timeout, self.generator.generate(&prompt.text))
            .await
            .map_err(|_| GenerateError::Timeout {
                duration_ms: generate_timeout.as_millis() as u64,
            })??;

        Ok(Answer {
            text,
            mode: retrieved.mode,
            chunks_used: prompt.chunks_included,
        })
    }

    /// Serialize the ready index for cross-run reuse
    pub fn snapshot(&self) -> Result<IndexSnapshot> {
        match &*self.lock_state() {
            SessionState::Ready(index) | SessionState::Querying(index) => Ok(index.snapshot()),
            SessionState::Indexing => Err(RetrievalError::IndexingInProgress.into()),
            SessionState::Failed(err) => Err(RetrievalError::IndexingFailed {
                cause: err.to_string(),
            }
            .into()),
            SessionState::Uninitialized => Err(RetrievalError::NoDocument.into()),
        }
    }

    /// Publish a previously saved index instead of re-embedding
    ///
    /// The snapshot must match the configured embedder identity and
    /// dimension; a stale one is rejected so the caller re-loads.
    pub fn restore_snapshot(&self, snapshot: IndexSnapshot) -> Result<usize> {
        let expected_identity = self.embedder.as_ref().map(|e| e.identity().to_string());
        let expected_dimension = self.embedder.as_ref().map(|e| e.dimension());

        let index = VectorIndex::restore(
            snapshot,
            expected_identity.as_deref(),
            expected_dimension,
        )?;
        let count = index.len();
        self.set_state(SessionState::Ready(Arc::new(index)));
        Ok(count)
    }

    async fn index_document(&self) -> Result<VectorIndex> {
        let text = self.loader.load(&self.source).await?;
        let chunks = Chunker::with_max_chars(self.config.indexing.max_chunk_chars).split(&text)?;

        let embedder = match &self.embedder {
            Some(embedder) => embedder,
            None => return Ok(VectorIndex::lexical(chunks)),
        };

        // Fan-out/join: per-chunk calls run concurrently up to the
        // fan-out limit; the first failure cancels the rest, and the
        // index is materialized only after the full join succeeds.
        let semaphore = Arc::new(Semaphore::new(self.config.indexing.embed_fanout.max(1)));
        let embed_timeout = self.config.embed_timeout();

        let calls = chunks.iter().map(|chunk| {
            let semaphore = Arc::clone(&semaphore);
            let embedder = Arc::clone(embedder);
            let text = chunk.text.clone();
            async move {
                let _permit = semaphore.acquire().await.unwrap();
                timeout(embed_timeout, embedder.embed(&text))
                    .await
                    .map_err(|_| {
                        RagError::from(EmbedError::Timeout {
                            duration_ms: embed_timeout.as_millis() as u64,
                        })
                    })?
                    .map_err(RagError::from)
            }
        });

        let vectors = try_join_all(calls).await?;
        let index = VectorIndex::build(chunks, vectors, Some(embedder.identity()))?;
        Ok(index)
    }

    fn check_queryable(&self) -> Result<()> {
        match &*self.lock_state() {
            SessionState::Uninitialized => Err(RetrievalError::NoDocument.into()),
            SessionState::Indexing => Err(RetrievalError::IndexingInProgress.into()),
            SessionState::Failed(err) => Err(RetrievalError::IndexingFailed {
                cause: err.to_string(),
            }
            .into()),
            SessionState::Ready(_) | SessionState::Querying(_) => Ok(()),
        }
    }

    /// Transition Ready → Querying and hand out the index
    fn begin_query(&self) -> Result<Arc<VectorIndex>> {
        let mut state = self.lock_state();
        match &*state {
            SessionState::Ready(index) => {
                let index = Arc::clone(index);
                *state = SessionState::Querying(Arc::clone(&index));
                Ok(index)
            }
            SessionState::Querying(index) => Ok(Arc::clone(index)),
            SessionState::Uninitialized => Err(RetrievalError::NoDocument.into()),
            SessionState::Indexing => Err(RetrievalError::IndexingInProgress.into()),
            SessionState::Failed(err) => Err(RetrievalError::IndexingFailed {
                cause: err.to_string(),
            }
            .into()),
        }
    }

    fn set_state(&self, next: SessionState) {
        *self.lock_state() = next;
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, SessionState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Restores `Querying → Ready` on drop, covering answers, per-query
/// errors and abandoned (cancelled) queries alike
struct QueryGuard<'a> {
    state: &'a Mutex<SessionState>,
}

impl Drop for QueryGuard<'_> {
    fn drop(&mut self) {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let SessionState::Querying(index) = &*state {
            *state = SessionState::Ready(Arc::clone(index));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Chunk;
    use crate::errors::ChunkingError;

    #[test]
    fn test_state_names() {
        assert_eq!(SessionState::Uninitialized.name(), "Uninitialized");
        assert_eq!(SessionState::Indexing.name(), "Indexing");
        assert_eq!(
            SessionState::Failed(RagError::Chunking(ChunkingError)).name(),
            "Failed"
        );
    }

    #[test]
    fn test_query_guard_restores_ready() {
        let index = Arc::new(VectorIndex::lexical(vec![Chunk {
            ordinal: 0,
            text: "only".into(),
        }]));
        let state = Mutex::new(SessionState::Querying(index));

        {
            let _guard = QueryGuard { state: &state };
        }

        assert!(matches!(*state.lock().unwrap(), SessionState::Ready(_)));
    }

    #[test]
    fn test_query_guard_leaves_other_states_alone() {
        let state = Mutex::new(SessionState::Indexing);

        {
            let _guard = QueryGuard { state: &state };
        }

        assert!(matches!(*state.lock().unwrap(), SessionState::Indexing));
    }
}
