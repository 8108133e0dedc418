//! Document loaders
//!
//! `DocumentLoader` obtains raw UTF-8 text for a document. Plain-text
//! files are read directly; binary formats (PDF and friends) go through
//! an external `TextExtractor` capability whose failures are wrapped as
//! `LoadError`.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::errors::LoadError;

/// Where a document comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    /// A file on disk
    Path(PathBuf),
    /// Text already in memory (test harnesses, pasted content)
    Inline(String),
}

impl DocumentSource {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self::Path(path.into())
    }

    pub fn inline(text: impl Into<String>) -> Self {
        Self::Inline(text.into())
    }

    /// Human-readable identity for display and diagnostics
    pub fn describe(&self) -> String {
        match self {
            Self::Path(p) => p.display().to_string(),
            Self::Inline(_) => "<inline text>".to_string(),
        }
    }
}

/// Obtains raw text for a document. Pure read, no shared-state mutation.
#[async_trait]
pub trait DocumentLoader: Send + Sync {
    async fn load(&self, source: &DocumentSource) -> Result<String, LoadError>;
}

/// Extraction capability for binary document formats
///
/// Implemented outside the pipeline (a pdftotext wrapper, a vendored
/// parser, a test double). Returns the document's full UTF-8 text.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// File extensions this extractor handles, lowercase without the dot
    fn supported_extensions(&self) -> &[&str];

    async fn extract(&self, path: &Path) -> Result<String, LoadError>;
}

/// Loader for plain UTF-8 text files and inline text
pub struct PlainTextLoader;

#[async_trait]
impl DocumentLoader for PlainTextLoader {
    async fn load(&self, source: &DocumentSource) -> Result<String, LoadError> {
        let text = match source {
            DocumentSource::Inline(text) => text.clone(),
            DocumentSource::Path(path) => tokio::fs::read_to_string(path)
                .await
                .map_err(|e| LoadError::Unreadable(format!("{}: {}", path.display(), e)))?,
        };

        if text.trim().is_empty() {
            return Err(LoadError::EmptyDocument);
        }

        Ok(text)
    }
}

/// Loader that routes binary formats through a `TextExtractor` and
/// falls back to plain-text reading for everything else
pub struct ExtractedDocumentLoader {
    extractor: Box<dyn TextExtractor>,
}

impl ExtractedDocumentLoader {
    pub fn new(extractor: Box<dyn TextExtractor>) -> Self {
        Self { extractor }
    }

    fn wants(&self, path: &Path) -> bool {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext {
            Some(ext) => self.extractor.supported_extensions().contains(&ext.as_str()),
            None => false,
        }
    }
}

#[async_trait]
impl DocumentLoader for ExtractedDocumentLoader {
    async fn load(&self, source: &DocumentSource) -> Result<String, LoadError> {
        match source {
            DocumentSource::Path(path) if self.wants(path) => {
                let text = self.extractor.extract(path).await?;
                if text.trim().is_empty() {
                    return Err(LoadError::EmptyDocument);
                }
                Ok(text)
            }
            _ => PlainTextLoader.load(source).await,
        }
    }
}
