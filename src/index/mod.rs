//! In-memory vector index
//!
//! A flat arena: chunk records plus an equal-length run of fixed-width
//! vectors addressed by the same ordinal. Immutable once built, so any
//! number of in-flight queries may read it concurrently without locks.
//! Scoring is either cosine similarity over true embeddings or, when no
//! embedder is configured, a lexical token-overlap count — a documented
//! degraded mode, not an error.

pub mod retriever;

pub use retriever::Retriever;

use serde::{Deserialize, Serialize};

use crate::document::Chunk;
use crate::errors::IndexError;

/// How retrieval scores were computed, reported with every result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoringMode {
    /// Cosine similarity over embedding vectors
    Cosine,
    /// Lexical token-overlap fallback (no embedder configured)
    LexicalOverlap,
}

/// One retrieved chunk with its similarity score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// Ordered retrieval output: descending score, ties by ascending ordinal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub hits: Vec<ScoredChunk>,
    pub mode: ScoringMode,
}

/// Serialized index form for optional cross-run reuse
///
/// Carries the embedder identity and dimension so a reload can detect a
/// stale snapshot and force re-embedding instead of serving vectors that
/// no longer match the configured model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSnapshot {
    pub embedder_identity: Option<String>,
    pub dimension: usize,
    pub mode: ScoringMode,
    pub chunks: Vec<Chunk>,
    pub vectors: Vec<f32>,
}

/// Immutable chunk/vector arena with top-k similarity search
#[derive(Debug)]
pub struct VectorIndex {
    chunks: Vec<Chunk>,
    /// Row-major vector arena, `chunks.len() * dimension` floats
    vectors: Vec<f32>,
    /// Fixed per index; 0 in lexical mode
    dimension: usize,
    mode: ScoringMode,
    embedder_identity: Option<String>,
}

impl VectorIndex {
    /// Build a cosine-mode index from parallel chunk and vector sequences
    ///
    /// Requires `chunks.len() == vectors.len()` and a single consistent
    /// dimension across all vectors. The index exists in full or not at
    /// all; a failed build publishes nothing.
    pub fn build(
        chunks: Vec<Chunk>,
        vectors: Vec<Vec<f32>>,
        embedder_identity: Option<&str>,
    ) -> Result<Self, IndexError> {
        if chunks.len() != vectors.len() {
            return Err(IndexError::CountMismatch {
                chunks: chunks.len(),
                vectors: vectors.len(),
            });
        }

        let dimension = vectors.first().map(|v| v.len()).unwrap_or(0);
        for (ordinal, vector) in vectors.iter().enumerate() {
            if vector.len() != dimension {
                return Err(IndexError::DimensionMismatch {
                    ordinal,
                    expected: dimension,
                    actual: vector.len(),
                });
            }
        }

        let mut arena = Vec::with_capacity(chunks.len() * dimension);
        for vector in &vectors {
            arena.extend_from_slice(vector);
        }

        Ok(Self {
            chunks,
            vectors: arena,
            dimension,
            mode: ScoringMode::Cosine,
            embedder_identity: embedder_identity.map(str::to_string),
        })
    }

    /// Build a lexical-fallback index holding chunks only
    pub fn lexical(chunks: Vec<Chunk>) -> Self {
        Self {
            chunks,
            vectors: Vec::new(),
            dimension: 0,
            mode: ScoringMode::LexicalOverlap,
            embedder_identity: None,
        }
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn mode(&self) -> ScoringMode {
        self.mode
    }

    pub fn embedder_identity(&self) -> Option<&str> {
        self.embedder_identity.as_deref()
    }

    /// O(1) chunk lookup by ordinal
    pub fn get(&self, ordinal: usize) -> Option<&Chunk> {
        self.chunks.get(ordinal)
    }

    fn row(&self, ordinal: usize) -> &[f32] {
        let start = ordinal * self.dimension;
        &self.vectors[start..start + self.dimension]
    }

    /// Top-k cosine search, k clamped to the index size
    ///
    /// Scans every stored vector (naive O(n·D), fine for the targeted
    /// corpus sizes) and returns hits in descending score order with
    /// ties broken by ascending ordinal.
    pub fn search(&self, query: &[f32], k: usize) -> Result<RetrievalResult, IndexError> {
        if self.mode != ScoringMode::Cosine {
            // Lexical indices have no vectors to compare against
            return Err(IndexError::QueryDimensionMismatch {
                expected: 0,
                actual: query.len(),
            });
        }
        if query.len() != self.dimension {
            return Err(IndexError::QueryDimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let scored = (0..self.chunks.len())
            .map(|ordinal| (ordinal, cosine_similarity(query, self.row(ordinal))))
            .collect();

        Ok(self.rank(scored, k))
    }

    /// Top-k lexical token-overlap search, k clamped to the index size
    ///
    /// Score is the number of query tokens (lowercased, whitespace
    /// split, duplicates counted) that occur among the chunk's tokens.
    pub fn search_lexical(&self, query: &str, k: usize) -> RetrievalResult {
        let query_tokens: Vec<String> = tokenize(query);

        let scored = self
            .chunks
            .iter()
            .enumerate()
            .map(|(ordinal, chunk)| {
                let chunk_tokens = tokenize(&chunk.text);
                let overlap = query_tokens
                    .iter()
                    .filter(|t| chunk_tokens.contains(t))
                    .count();
                (ordinal, overlap as f32)
            })
            .collect();

        self.rank(scored, k)
    }

    /// Sort scored ordinals into the documented total order and keep k
    fn rank(&self, mut scored: Vec<(usize, f32)>, k: usize) -> RetrievalResult {
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        scored.truncate(k.min(self.chunks.len()));

        let hits = scored
            .into_iter()
            .map(|(ordinal, score)| ScoredChunk {
                chunk: self.chunks[ordinal].clone(),
                score,
            })
            .collect();

        RetrievalResult {
            hits,
            mode: self.mode,
        }
    }

    /// Serialize for optional cross-run reuse
    pub fn snapshot(&self) -> IndexSnapshot {
        IndexSnapshot {
            embedder_identity: self.embedder_identity.clone(),
            dimension: self.dimension,
            mode: self.mode,
            chunks: self.chunks.clone(),
            vectors: self.vectors.clone(),
        }
    }

    /// Rebuild from a snapshot, rejecting stale ones
    ///
    /// A snapshot built by a different embedder identity or dimension
    /// must not be served; the caller should re-embed instead.
    pub fn restore(
        snapshot: IndexSnapshot,
        expected_identity: Option<&str>,
        expected_dimension: Option<usize>,
    ) -> Result<Self, IndexError> {
        if let Some(expected) = expected_identity {
            if snapshot.embedder_identity.as_deref() != Some(expected) {
                return Err(IndexError::StaleSnapshot(format!(
                    "snapshot embedder {:?} does not match configured {}",
                    snapshot.embedder_identity, expected
                )));
            }
        }
        if let Some(expected) = expected_dimension {
            if snapshot.dimension != expected {
                return Err(IndexError::StaleSnapshot(format!(
                    "snapshot dimension {} does not match configured {}",
                    snapshot.dimension, expected
                )));
            }
        }
        if snapshot.dimension > 0
            && snapshot.vectors.len() != snapshot.chunks.len() * snapshot.dimension
        {
            return Err(IndexError::CountMismatch {
                chunks: snapshot.chunks.len(),
                vectors: snapshot.vectors.len() / snapshot.dimension.max(1),
            });
        }

        Ok(Self {
            chunks: snapshot.chunks,
            vectors: snapshot.vectors,
            dimension: snapshot.dimension,
            mode: snapshot.mode,
            embedder_identity: snapshot.embedder_identity,
        })
    }
}

/// Normalized dot product; zero-norm vectors score 0.0
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Lowercase whitespace tokens with punctuation trimmed from the edges,
/// so "delta" matches "delta."
fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(ordinal: usize, text: &str) -> Chunk {
        Chunk {
            ordinal,
            text: text.to_string(),
        }
    }

    fn scenario_chunks() -> Vec<Chunk> {
        vec![
            chunk(0, "Alpha bravo."),
            chunk(1, "Charlie delta."),
            chunk(2, "Echo foxtrot."),
        ]
    }

    #[test]
    fn test_build_results_are_debug_printable() {
        // Both arms of the build result must format, since tests and
        // callers unwrap them
        let ok = VectorIndex::build(scenario_chunks(), vec![vec![1.0]; 3], None);
        assert!(format!("{:?}", ok).contains("VectorIndex"));

        let err = VectorIndex::build(scenario_chunks(), vec![], None);
        assert!(format!("{:?}", err).contains("CountMismatch"));
    }

    #[test]
    fn test_build_rejects_count_mismatch() {
        let err = VectorIndex::build(scenario_chunks(), vec![vec![1.0, 0.0]], None).unwrap_err();
        assert!(matches!(err, IndexError::CountMismatch { chunks: 3, vectors: 1 }));
    }

    #[test]
    fn test_build_rejects_ragged_dimensions() {
        let vectors = vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0]];
        let err = VectorIndex::build(scenario_chunks(), vectors, None).unwrap_err();
        assert!(matches!(
            err,
            IndexError::DimensionMismatch { ordinal: 2, expected: 2, actual: 1 }
        ));
    }

    #[test]
    fn test_cosine_search_ranks_by_similarity() {
        let vectors = vec![
            vec![1.0, 0.0, 0.0],
            vec![0.0, 1.0, 0.0],
            vec![0.7, 0.7, 0.0],
        ];
        let index = VectorIndex::build(scenario_chunks(), vectors, Some("test/embedder")).unwrap();

        let result = index.search(&[0.0, 1.0, 0.0], 2).unwrap();
        assert_eq!(result.mode, ScoringMode::Cosine);
        assert_eq!(result.hits.len(), 2);
        assert_eq!(result.hits[0].chunk.ordinal, 1);
        assert!(result.hits[0].score > result.hits[1].score);
    }

    #[test]
    fn test_search_clamps_k_to_index_size() {
        let vectors = vec![vec![1.0], vec![0.5], vec![0.2]];
        let index = VectorIndex::build(scenario_chunks(), vectors, None).unwrap();

        assert_eq!(index.search(&[1.0], 100).unwrap().hits.len(), 3);
        assert_eq!(index.search(&[1.0], 0).unwrap().hits.len(), 0);
    }

    #[test]
    fn test_search_is_deterministic() {
        let vectors = vec![
            vec![0.9, 0.1],
            vec![0.1, 0.9],
            vec![0.5, 0.5],
        ];
        let index = VectorIndex::build(scenario_chunks(), vectors, None).unwrap();
        let query = [0.6, 0.4];

        let first = index.search(&query, 3).unwrap();
        let second = index.search(&query, 3).unwrap();

        let ordinals = |r: &RetrievalResult| r.hits.iter().map(|h| h.chunk.ordinal).collect::<Vec<_>>();
        assert_eq!(ordinals(&first), ordinals(&second));
    }

    #[test]
    fn test_equal_scores_break_ties_by_ordinal() {
        // Identical vectors give identical scores for any query
        let vectors = vec![vec![1.0, 1.0]; 3];
        let index = VectorIndex::build(scenario_chunks(), vectors, None).unwrap();

        let result = index.search(&[1.0, 0.0], 3).unwrap();
        let ordinals: Vec<usize> = result.hits.iter().map(|h| h.chunk.ordinal).collect();
        assert_eq!(ordinals, vec![0, 1, 2]);
    }

    #[test]
    fn test_rebuild_yields_identical_results() {
        let vectors = vec![
            vec![0.2, 0.8],
            vec![0.8, 0.2],
            vec![0.5, 0.5],
        ];
        let a = VectorIndex::build(scenario_chunks(), vectors.clone(), None).unwrap();
        let b = VectorIndex::build(scenario_chunks(), vectors, None).unwrap();

        let query = [0.3, 0.7];
        let ra = a.search(&query, 3).unwrap();
        let rb = b.search(&query, 3).unwrap();
        for (ha, hb) in ra.hits.iter().zip(rb.hits.iter()) {
            assert_eq!(ha.chunk.ordinal, hb.chunk.ordinal);
            assert_eq!(ha.score, hb.score);
        }
    }

    #[test]
    fn test_query_dimension_mismatch_rejected() {
        let vectors = vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 1.0]];
        let index = VectorIndex::build(scenario_chunks(), vectors, None).unwrap();

        let err = index.search(&[1.0, 0.0, 0.0], 1).unwrap_err();
        assert!(matches!(
            err,
            IndexError::QueryDimensionMismatch { expected: 2, actual: 3 }
        ));
    }

    #[test]
    fn test_lexical_overlap_scenario() {
        // "delta" matches only "Charlie delta."
        let index = VectorIndex::lexical(scenario_chunks());
        let result = index.search_lexical("delta", 1);

        assert_eq!(result.mode, ScoringMode::LexicalOverlap);
        assert_eq!(result.hits.len(), 1);
        assert_eq!(result.hits[0].chunk.text, "Charlie delta.");
        assert_eq!(result.hits[0].score, 1.0);
    }

    #[test]
    fn test_lexical_zero_overlap_falls_back_to_ordinal_order() {
        let index = VectorIndex::lexical(scenario_chunks());
        let result = index.search_lexical("zulu", 3);

        let ordinals: Vec<usize> = result.hits.iter().map(|h| h.chunk.ordinal).collect();
        assert_eq!(ordinals, vec![0, 1, 2]);
        assert!(result.hits.iter().all(|h| h.score == 0.0));
    }

    #[test]
    fn test_lexical_is_case_insensitive() {
        let index = VectorIndex::lexical(scenario_chunks());
        let result = index.search_lexical("CHARLIE", 1);
        assert_eq!(result.hits[0].chunk.ordinal, 1);
        assert_eq!(result.hits[0].score, 1.0);
    }

    #[test]
    fn test_lexical_index_rejects_vector_search() {
        let index = VectorIndex::lexical(scenario_chunks());
        assert!(index.search(&[1.0, 0.0], 1).is_err());
    }

    #[test]
    fn test_snapshot_round_trip() {
        let vectors = vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.5, 0.5]];
        let index =
            VectorIndex::build(scenario_chunks(), vectors, Some("ollama/nomic-embed-text")).unwrap();

        let snapshot = index.snapshot();
        let json = serde_json::to_string(&snapshot).unwrap();
        let parsed: IndexSnapshot = serde_json::from_str(&json).unwrap();

        let restored =
            VectorIndex::restore(parsed, Some("ollama/nomic-embed-text"), Some(2)).unwrap();
        let query = [1.0, 0.2];
        let before = index.search(&query, 3).unwrap();
        let after = restored.search(&query, 3).unwrap();
        for (a, b) in before.hits.iter().zip(after.hits.iter()) {
            assert_eq!(a.chunk.ordinal, b.chunk.ordinal);
            assert_eq!(a.score, b.score);
        }
    }

    #[test]
    fn test_restore_rejects_identity_mismatch() {
        let vectors = vec![vec![1.0], vec![0.0], vec![0.5]];
        let index = VectorIndex::build(scenario_chunks(), vectors, Some("ollama/old")).unwrap();

        let err = VectorIndex::restore(index.snapshot(), Some("ollama/new"), None).unwrap_err();
        assert!(matches!(err, IndexError::StaleSnapshot(_)));
    }

    #[test]
    fn test_restore_rejects_dimension_mismatch() {
        let vectors = vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.5, 0.5]];
        let index = VectorIndex::build(scenario_chunks(), vectors, Some("ollama/m")).unwrap();

        let err = VectorIndex::restore(index.snapshot(), Some("ollama/m"), Some(768)).unwrap_err();
        assert!(matches!(err, IndexError::StaleSnapshot(_)));
    }

    #[test]
    fn test_ordinal_lookup_is_direct() {
        let index = VectorIndex::lexical(scenario_chunks());
        assert_eq!(index.get(1).unwrap().text, "Charlie delta.");
        assert!(index.get(3).is_none());
    }
}
