//! Presentation-facing service
//!
//! `RagService` owns the session registry and exposes the narrow
//! request/response contract any caller (chat UI, CLI, test harness)
//! consumes: open a session, submit a query, reload, close. Sessions
//! are fully isolated and run concurrently.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::config::RagConfig;
use crate::document::{DocumentLoader, DocumentSource};
use crate::embedding::Embedder;
use crate::errors::{RagError, Result};
use crate::generation::Generator;
use crate::session::{Answer, RagSession};

/// Session registry implementing the submit-query contract
pub struct RagService {
    sessions: RwLock<HashMap<Uuid, Arc<RagSession>>>,
}

impl RagService {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Create a session for a document and start indexing it
    ///
    /// Returns the session id immediately; indexing runs in the
    /// background so callers can poll state or just start asking (and
    /// get a typed not-ready answer until the index is published).
    pub async fn open_session(
        &self,
        source: DocumentSource,
        loader: Arc<dyn DocumentLoader>,
        embedder: Option<Arc<dyn Embedder>>,
        generator: Arc<dyn Generator>,
        config: RagConfig,
    ) -> Uuid {
        let session = Arc::new(RagSession::new(source, loader, embedder, generator, config));
        let id = session.id();

        self.sessions.write().await.insert(id, Arc::clone(&session));

        tokio::spawn(async move {
            // Failure is retained in the session state and reported to
            // the next query; nothing to do with it here
            let _ = session.load().await;
        });

        id
    }

    /// Like `open_session` but waits for indexing to finish, returning
    /// the chunk count
    pub async fn open_session_blocking(
        &self,
        source: DocumentSource,
        loader: Arc<dyn DocumentLoader>,
        embedder: Option<Arc<dyn Embedder>>,
        generator: Arc<dyn Generator>,
        config: RagConfig,
    ) -> (Uuid, Result<usize>) {
        let session = Arc::new(RagSession::new(source, loader, embedder, generator, config));
        let id = session.id();

        self.sessions.write().await.insert(id, Arc::clone(&session));
        let outcome = session.load().await;

        (id, outcome)
    }

    /// Answer a question in the context of one session
    pub async fn submit_query(&self, session_id: Uuid, query: &str) -> Result<Answer> {
        let session = self.get(session_id).await?;
        session.ask(query).await
    }

    /// Explicitly re-index a session's document (the only way out of
    /// a failed state)
    pub async fn reload(&self, session_id: Uuid) -> Result<usize> {
        let session = self.get(session_id).await?;
        session.load().await
    }

    /// Current state tag for a session ("Indexing", "Ready", ...)
    pub async fn session_state(&self, session_id: Uuid) -> Result<&'static str> {
        Ok(self.get(session_id).await?.state_name())
    }

    /// Tear a session down, dropping its index
    pub async fn close_session(&self, session_id: Uuid) -> Result<()> {
        self.sessions
            .write()
            .await
            .remove(&session_id)
            .map(|_| ())
            .ok_or(RagError::UnknownSession(session_id))
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    async fn get(&self, session_id: Uuid) -> Result<Arc<RagSession>> {
        self.sessions
            .read()
            .await
            .get(&session_id)
            .cloned()
            .ok_or(RagError::UnknownSession(session_id))
    }
}

impl Default for RagService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::PlainTextLoader;
    use crate::errors::GenerateError;
    use async_trait::async_trait;

    struct EchoGenerator;

    #[async_trait]
    impl Generator for EchoGenerator {
        async fn generate(&self, prompt: &str) -> std::result::Result<String, GenerateError> {
            Ok(format!("echo: {} chars", prompt.len()))
        }

        fn identity(&self) -> &str {
            "test/echo"
        }
    }

    fn lexical_session_parts() -> (DocumentSource, Arc<dyn DocumentLoader>, Arc<dyn Generator>) {
        (
            DocumentSource::inline("Alpha bravo.\n\nCharlie delta.\n\nEcho foxtrot."),
            Arc::new(PlainTextLoader),
            Arc::new(EchoGenerator),
        )
    }

    #[tokio::test]
    async fn test_unknown_session_is_typed_error() {
        let service = RagService::new();
        let err = service.submit_query(Uuid::new_v4(), "hi").await.unwrap_err();
        assert!(matches!(err, RagError::UnknownSession(_)));
    }

    #[tokio::test]
    async fn test_open_query_close_round_trip() {
        let service = RagService::new();
        let (source, loader, generator) = lexical_session_parts();

        let (id, loaded) = service
            .open_session_blocking(source, loader, None, generator, RagConfig::default())
            .await;
        assert_eq!(loaded.unwrap(), 3);

        let answer = service.submit_query(id, "delta").await.unwrap();
        assert!(answer.text.starts_with("echo:"));

        service.close_session(id).await.unwrap();
        assert_eq!(service.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_open_session_indexes_in_background() {
        let service = RagService::new();
        let (source, loader, generator) = lexical_session_parts();

        let id = service
            .open_session(source, loader, None, generator, RagConfig::default())
            .await;

        for _ in 0..100 {
            if service.session_state(id).await.unwrap() == "Ready" {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(service.session_state(id).await.unwrap(), "Ready");
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let service = RagService::new();

        let (s1, l1, g1) = lexical_session_parts();
        let (id1, r1) = service
            .open_session_blocking(s1, l1, None, g1, RagConfig::default())
            .await;
        r1.unwrap();

        let (_, l2, g2) = lexical_session_parts();
        let (id2, r2) = service
            .open_session_blocking(
                DocumentSource::inline("Completely different text."),
                l2,
                None,
                g2,
                RagConfig::default(),
            )
            .await;
        r2.unwrap();

        assert_ne!(id1, id2);
        // Closing one leaves the other answering
        service.close_session(id1).await.unwrap();
        assert!(service.submit_query(id2, "different").await.is_ok());
    }
}
