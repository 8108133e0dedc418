//! Document ingestion: loading raw text and splitting it into chunks
//!
//! Loading is a capability seam — binary formats go through an external
//! `TextExtractor` so the pipeline never parses document bytes itself.

pub mod chunker;
pub mod loader;

pub use chunker::{Chunk, Chunker};
pub use loader::{DocumentLoader, DocumentSource, ExtractedDocumentLoader, PlainTextLoader, TextExtractor};
