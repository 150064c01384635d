//! The document loading seam.
//!
//! The retrieval core accepts whatever text a [`DocumentLoader`] produces
//! and never inspects the underlying format. A PDF pipeline plugs in by
//! implementing the trait over its extractor of choice; the bundled
//! [`PlainTextLoader`] covers text files and `pdftotext`-style output where
//! form feeds separate pages.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// A piece of raw document text with positional metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSegment {
    pub text: String,
    /// 1-based page number, when the source has pages.
    pub page: Option<usize>,
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Produces the raw text segments of one document.
///
/// Loaders are read-only collaborators: the core calls `load` at most once
/// per index build and discards the segments after chunking.
#[async_trait]
pub trait DocumentLoader: Send + Sync {
    async fn load(&self) -> Result<Vec<DocumentSegment>, LoadError>;

    /// Identifier of the source, for logs and index naming.
    fn source(&self) -> &str;
}

/// Loads a UTF-8 text file, splitting pages on form feed characters.
#[derive(Debug, Clone)]
pub struct PlainTextLoader {
    path: PathBuf,
    source: String,
}

impl PlainTextLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let source = path.display().to_string();
        Self { path, source }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl DocumentLoader for PlainTextLoader {
    async fn load(&self) -> Result<Vec<DocumentSegment>, LoadError> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| LoadError::Io {
                path: self.path.clone(),
                source,
            })?;

        let paged = raw.contains('\u{000C}');
        let segments = raw
            .split('\u{000C}')
            .enumerate()
            .filter(|(_, text)| !text.trim().is_empty())
            .map(|(i, text)| DocumentSegment {
                text: text.to_string(),
                page: paged.then_some(i + 1),
            })
            .collect();
        Ok(segments)
    }

    fn source(&self) -> &str {
        &self.source
    }
}

/// A loader over segments already in memory. Used by tests and demos, and
/// by callers that extract text themselves.
#[derive(Debug, Clone)]
pub struct InMemoryLoader {
    segments: Vec<DocumentSegment>,
    source: String,
}

impl InMemoryLoader {
    pub fn new(segments: Vec<DocumentSegment>) -> Self {
        Self {
            segments,
            source: "memory".to_string(),
        }
    }

    /// Convenience constructor: one segment per page, pages numbered from 1.
    pub fn from_pages<S: Into<String>>(pages: Vec<S>) -> Self {
        Self::new(
            pages
                .into_iter()
                .enumerate()
                .map(|(i, text)| DocumentSegment {
                    text: text.into(),
                    page: Some(i + 1),
                })
                .collect(),
        )
    }
}

#[async_trait]
impl DocumentLoader for InMemoryLoader {
    async fn load(&self) -> Result<Vec<DocumentSegment>, LoadError> {
        Ok(self.segments.clone())
    }

    fn source(&self) -> &str {
        &self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn plain_text_loader_splits_pages_on_form_feed() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "page one\u{000C}page two\u{000C}page three").unwrap();

        let loader = PlainTextLoader::new(file.path());
        let segments = loader.load().await.unwrap();
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0].text, "page one");
        assert_eq!(segments[0].page, Some(1));
        assert_eq!(segments[2].page, Some(3));
    }

    #[tokio::test]
    async fn plain_text_loader_without_form_feeds_is_unpaged() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "just one body of text").unwrap();

        let loader = PlainTextLoader::new(file.path());
        let segments = loader.load().await.unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].page, None);
    }

    #[tokio::test]
    async fn missing_file_is_a_load_error() {
        let loader = PlainTextLoader::new("/definitely/not/here.txt");
        assert!(matches!(
            loader.load().await,
            Err(LoadError::Io { .. })
        ));
    }

    #[tokio::test]
    async fn blank_pages_are_skipped() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "content\u{000C}   \u{000C}more").unwrap();

        let loader = PlainTextLoader::new(file.path());
        let segments = loader.load().await.unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[1].page, Some(3));
    }
}
