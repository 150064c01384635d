//! Text preparation for the quill retrieval pipeline.
//!
//! This crate turns raw document text into the normalized, fixed-size,
//! overlapping chunks that the retriever embeds and indexes. It is pure and
//! synchronous: no I/O, no async, no knowledge of where the text came from
//! or where the chunks go.
//!
//! Two stages, applied in order and always to the whole document (never to
//! individual chunks, so chunk boundaries stay consistent):
//!
//! - [`normalize`]: strips citation markers and characters outside a fixed
//!   allow-list. A stricter keyword mode additionally lowercases, drops
//!   stop-words, and stems each token. Both modes are idempotent.
//! - [`chunk`]: splits the normalized text into chunks of at most
//!   `chunk_size` bytes where consecutive chunks share exactly `overlap`
//!   bytes, preferring to cut at whitespace near the target size.
//!
//! ```
//! use quill_context::{ChunkConfig, Normalizer, TextSplitter};
//!
//! let normalizer = Normalizer::new(Default::default());
//! let text = normalizer.normalize("Attention is all you need [1].");
//! assert_eq!(text, "Attention is all you need .");
//!
//! let splitter = TextSplitter::new(ChunkConfig::default()).unwrap();
//! let chunks = splitter.split(&text);
//! assert_eq!(chunks.len(), 1);
//! assert_eq!(chunks[0].offset, 0);
//! ```

pub mod chunk;
pub mod normalize;

pub use chunk::{Chunk, ChunkConfig, ContextError, TextSplitter};
pub use normalize::{NormalizeMode, Normalizer};
