//! docbuddy - ask questions about a document from your terminal
//!
//! Retrieval-augmented generation over a single ingested document:
//! the document is chunked, embedded and held in an in-memory vector
//! index; each question retrieves the most relevant chunks and feeds
//! them, with the question, to a generation model.
//!
//! # Architecture
//!
//! - `document`: loading (with an extraction capability for binary
//!   formats) and blank-line chunking
//! - `embedding` / `generation`: capability traits plus Ollama and
//!   Gemini adapters
//! - `index`: immutable flat-arena vector index, cosine search and the
//!   lexical-overlap fallback
//! - `prompt`: bounded prompt assembly
//! - `session`: the load-then-query state machine
//! - `service`: session registry consumed by any front end

pub mod errors;
pub mod config;
pub mod document;
pub mod embedding;
pub mod index;
pub mod prompt;
pub mod generation;
pub mod session;
pub mod service;

// Re-export commonly used types
pub use config::RagConfig;
pub use document::{Chunk, Chunker, DocumentLoader, DocumentSource, PlainTextLoader};
pub use embedding::Embedder;
pub use errors::{RagError, Result};
pub use generation::Generator;
pub use index::{RetrievalResult, ScoredChunk, ScoringMode, VectorIndex};
pub use session::{Answer, RagSession, SessionState};
pub use service::RagService;
