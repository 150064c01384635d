//! Overlapping fixed-size text chunking.
//!
//! The splitter walks the normalized document left to right. Each chunk
//! ends at most `chunk_size` bytes after it starts; the end is pulled back
//! to the last whitespace within a tolerance window so words survive intact
//! when possible, with a hard cut as the fallback. The next chunk starts
//! exactly `overlap` bytes before the previous one ended, so:
//!
//! - every byte of the input is covered by at least one chunk,
//! - consecutive chunks share exactly `overlap` bytes,
//! - concatenating the first chunk with each later chunk minus its first
//!   `overlap` bytes reconstructs the input.
//!
//! Offsets are byte offsets. Normalized text is ASCII so these are also
//! character offsets; non-ASCII input is still handled without panics by
//! snapping cuts to character boundaries.

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContextError {
    #[error("chunk overlap ({overlap}) must be smaller than chunk size ({chunk_size})")]
    OverlapTooLarge { chunk_size: usize, overlap: usize },
    #[error("chunk size must be greater than zero")]
    ZeroChunkSize,
}

/// Chunking parameters.
///
/// Defaults match the retrieval pipeline: 1000-byte chunks with a 200-byte
/// overlap so a concept spanning a boundary stays retrievable from at least
/// one chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkConfig {
    /// Maximum chunk length in bytes.
    pub chunk_size: usize,
    /// Bytes shared between consecutive chunks.
    pub overlap: usize,
    /// How far before `chunk_size` the splitter may pull a cut back to land
    /// on whitespace. `None` means a tenth of the chunk size.
    pub boundary_tolerance: Option<usize>,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            overlap: 200,
            boundary_tolerance: None,
        }
    }
}

impl ChunkConfig {
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        Self {
            chunk_size,
            overlap,
            boundary_tolerance: None,
        }
    }

    pub fn with_boundary_tolerance(mut self, tolerance: usize) -> Self {
        self.boundary_tolerance = Some(tolerance);
        self
    }
}

/// A contiguous span of the normalized document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chunk {
    /// Position of this chunk in document order, 0-based.
    pub sequence: usize,
    /// Byte offset of the chunk start in the normalized document.
    pub offset: usize,
    /// The chunk text.
    pub text: String,
}

/// Splits normalized text into overlapping chunks.
#[derive(Debug, Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    overlap: usize,
    tolerance: usize,
}

impl TextSplitter {
    /// Validates the configuration. The overlap must leave room for the
    /// cursor to advance even after a maximal boundary snap.
    pub fn new(config: ChunkConfig) -> Result<Self, ContextError> {
        if config.chunk_size == 0 {
            return Err(ContextError::ZeroChunkSize);
        }
        if config.overlap >= config.chunk_size {
            return Err(ContextError::OverlapTooLarge {
                chunk_size: config.chunk_size,
                overlap: config.overlap,
            });
        }
        let stride = config.chunk_size - config.overlap;
        let tolerance = config
            .boundary_tolerance
            .unwrap_or(config.chunk_size / 10)
            .min(stride.saturating_sub(1));
        Ok(Self {
            chunk_size: config.chunk_size,
            overlap: config.overlap,
            tolerance,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split `text` into chunks. Empty input yields an empty vec; input no
    /// longer than the chunk size yields exactly one chunk.
    pub fn split(&self, text: &str) -> Vec<Chunk> {
        let len = text.len();
        let mut chunks = Vec::new();
        if len == 0 {
            return chunks;
        }

        let mut cursor = 0usize;
        loop {
            let end = self.chunk_end(text, cursor);
            chunks.push(Chunk {
                sequence: chunks.len(),
                offset: cursor,
                text: text[cursor..end].to_string(),
            });
            if end == len {
                return chunks;
            }
            let mut next = end - self.overlap;
            while !text.is_char_boundary(next) {
                next -= 1;
            }
            // Multi-byte boundary adjustment can stall a tiny stride; give
            // up the overlap for that step rather than loop forever.
            cursor = if next > cursor { next } else { end };
        }
    }

    /// End of the chunk starting at `cursor`: `chunk_size` bytes out,
    /// snapped back to just past the last whitespace in the tolerance
    /// window, or hard-cut at a character boundary if the window has none.
    fn chunk_end(&self, text: &str, cursor: usize) -> usize {
        let len = text.len();
        if cursor + self.chunk_size >= len {
            return len;
        }
        let mut end = cursor + self.chunk_size;
        let window_start = end - self.tolerance;
        if let Some(pos) = text.as_bytes()[window_start..end]
            .iter()
            .rposition(|b| b.is_ascii_whitespace())
        {
            return window_start + pos + 1;
        }
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn splitter(chunk_size: usize, overlap: usize) -> TextSplitter {
        TextSplitter::new(ChunkConfig::new(chunk_size, overlap)).unwrap()
    }

    /// Drop each chunk's leading overlap and concatenate; the result must
    /// be the original document.
    fn reconstruct(chunks: &[Chunk], overlap: usize) -> String {
        let mut out = String::new();
        for chunk in chunks {
            if chunk.sequence == 0 {
                out.push_str(&chunk.text);
            } else {
                out.push_str(&chunk.text[overlap..]);
            }
        }
        out
    }

    #[test]
    fn empty_document_yields_no_chunks() {
        assert!(splitter(1000, 200).split("").is_empty());
    }

    #[test]
    fn short_document_yields_one_chunk() {
        let chunks = splitter(1000, 200).split("a short document");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "a short document");
        assert_eq!(chunks[0].offset, 0);
        assert_eq!(chunks[0].sequence, 0);
    }

    #[test]
    fn rejects_overlap_not_smaller_than_chunk_size() {
        assert!(TextSplitter::new(ChunkConfig::new(100, 100)).is_err());
        assert!(TextSplitter::new(ChunkConfig::new(100, 150)).is_err());
        assert!(TextSplitter::new(ChunkConfig::new(0, 0)).is_err());
    }

    #[test]
    fn chunks_cover_document_with_exact_overlap() {
        let text = "The quick brown fox jumps over the lazy dog. ".repeat(40);
        let overlap = 50;
        let chunks = splitter(200, overlap).split(&text);
        assert!(chunks.len() > 1);

        for chunk in &chunks {
            assert!(chunk.text.len() <= 200, "chunk too long: {}", chunk.text.len());
        }
        for pair in chunks.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            assert_eq!(b.offset, a.offset + a.text.len() - overlap);
            assert_eq!(
                &a.text[a.text.len() - overlap..],
                &b.text[..overlap],
                "adjacent chunks must share exactly the overlap"
            );
        }
        assert_eq!(reconstruct(&chunks, overlap), text);
    }

    #[test]
    fn prefers_whitespace_boundaries() {
        let text = "word ".repeat(100);
        let chunks = splitter(98, 20).split(&text);
        // Every non-final chunk should end just after a space rather than
        // mid-word, since spaces occur well inside the tolerance window.
        for chunk in &chunks[..chunks.len() - 1] {
            assert!(
                chunk.text.ends_with(' '),
                "chunk should end at whitespace: {:?}",
                &chunk.text[chunk.text.len().saturating_sub(10)..]
            );
        }
        assert_eq!(reconstruct(&chunks, 20), text);
    }

    #[test]
    fn hard_cut_when_no_whitespace_in_window() {
        let text = "x".repeat(950);
        let chunks = splitter(400, 100).split(&text);
        assert!(chunks.len() > 1);
        for chunk in &chunks[..chunks.len() - 1] {
            assert_eq!(chunk.text.len(), 400);
        }
        assert_eq!(reconstruct(&chunks, 100), text);
    }

    #[test]
    fn exact_multiple_of_chunk_size_terminates() {
        let text = "y".repeat(800);
        let chunks = splitter(400, 0).split(&text);
        assert_eq!(chunks.len(), 2);
        assert_eq!(reconstruct(&chunks, 0), text);
    }

    #[test]
    fn non_ascii_input_does_not_panic() {
        let text = "héllo wörld ∆ ".repeat(60);
        let chunks = splitter(100, 30).split(&text);
        assert!(!chunks.is_empty());
        for chunk in &chunks {
            assert!(chunk.text.len() <= 100);
        }
    }

    #[test]
    fn offsets_index_into_document() {
        let text = "alpha beta gamma delta ".repeat(30);
        let chunks = splitter(120, 40).split(&text);
        for chunk in &chunks {
            assert_eq!(&text[chunk.offset..chunk.offset + chunk.text.len()], chunk.text);
        }
    }
}
