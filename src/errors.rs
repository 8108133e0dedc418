//! Error types for the docbuddy RAG pipeline
//!
//! Every failure surfaces as a typed value: indexing errors fail the
//! owning session, per-query errors are returned to that query's caller.
//! All variants are `Clone` so a failed session can retain its cause and
//! re-report it to later queries.

use thiserror::Error;

/// Document loading errors
#[derive(Error, Debug, Clone)]
pub enum LoadError {
    /// Source file or handle could not be read
    #[error("Document source unreadable: {0}")]
    Unreadable(String),

    /// Format is not handled by any configured loader
    #[error("Unsupported document format: {0}")]
    UnsupportedFormat(String),

    /// The extraction capability failed on a binary document
    #[error("Text extraction failed: {0}")]
    Extraction(String),

    /// Extraction succeeded but produced no text
    #[error("No text extracted from document")]
    EmptyDocument,
}

/// Degenerate input yielded zero usable chunks
#[derive(Error, Debug, Clone)]
#[error("Document produced no usable chunks")]
pub struct ChunkingError;

/// Embedding service errors
#[derive(Error, Debug, Clone)]
pub enum EmbedError {
    /// Service unreachable or the model is not loaded
    #[error("Embedding model unavailable: {0}")]
    ModelUnavailable(String),

    /// Input exceeds the model's context window
    #[error("Embedding input too long: {chars} chars exceeds limit of {max}")]
    InputTooLong { chars: usize, max: usize },

    /// Per-call timeout elapsed
    #[error("Embedding call timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },
}

/// Index construction and snapshot errors
#[derive(Error, Debug, Clone)]
pub enum IndexError {
    /// Chunk and vector sequences must pair up one to one
    #[error("Chunk/vector count mismatch: {chunks} chunks vs {vectors} vectors")]
    CountMismatch { chunks: usize, vectors: usize },

    /// Every vector in one index must share a single dimension
    #[error("Vector dimension mismatch at ordinal {ordinal}: expected {expected}, got {actual}")]
    DimensionMismatch {
        ordinal: usize,
        expected: usize,
        actual: usize,
    },

    /// Query vector does not match the index dimension
    #[error("Query vector dimension {actual} does not match index dimension {expected}")]
    QueryDimensionMismatch { expected: usize, actual: usize },

    /// Snapshot was produced by a different embedder or dimension
    #[error("Stale index snapshot: {0}")]
    StaleSnapshot(String),
}

/// Search attempted against a session with no ready index
#[derive(Error, Debug, Clone)]
pub enum RetrievalError {
    /// Indexing is in flight; the caller should retry shortly
    #[error("Document is still being indexed, try again shortly")]
    IndexingInProgress,

    /// Indexing aborted; the retained cause is reported verbatim
    #[error("Indexing failed, reload required: {cause}")]
    IndexingFailed { cause: String },

    /// No load request was ever issued
    #[error("No document has been loaded into this session")]
    NoDocument,
}

/// Generation service errors
#[derive(Error, Debug, Clone)]
pub enum GenerateError {
    /// Credentials rejected by the service
    #[error("Generation service rejected credentials: {0}")]
    Auth(String),

    /// Service throttled the request
    #[error("Generation service rate-limited the request")]
    RateLimited,

    /// Transport-level failure
    #[error("Network error reaching generation service: {0}")]
    Network(String),

    /// Per-call timeout elapsed
    #[error("Generation call timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// Service answered but returned no usable text
    #[error("Generation service returned no usable text")]
    EmptyResponse,
}

/// Main error type for the docbuddy pipeline
#[derive(Error, Debug, Clone)]
pub enum RagError {
    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    #[error("Chunking error: {0}")]
    Chunking(#[from] ChunkingError),

    #[error("Embedding error: {0}")]
    Embed(#[from] EmbedError),

    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    #[error("Retrieval error: {0}")]
    Retrieval(#[from] RetrievalError),

    #[error("Generation error: {0}")]
    Generate(#[from] GenerateError),

    #[error("Unknown session: {0}")]
    UnknownSession(uuid::Uuid),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, RagError>;
