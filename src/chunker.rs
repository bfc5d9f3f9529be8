//! Boundary-aware text chunking with exact overlap carryover.
//!
//! [`TextChunker`] splits raw document text into bounded, overlapping
//! segments suitable for embedding. Cuts prefer sentence and paragraph
//! boundaries, then whitespace, and only fall back to a hard cut at the
//! window edge when no boundary exists past the overlap region. Every chunk
//! after the first starts exactly `chunk_overlap` characters before the
//! previous chunk's end, so stripping that prefix from each subsequent chunk
//! and concatenating reconstructs the input byte-for-byte.

use crate::types::RagError;

/// Characters treated as sentence or paragraph terminators when looking for
/// a cut point.
const SENTENCE_TERMINATORS: [char; 4] = ['.', '!', '?', '\n'];

/// Deterministic, boundary-preferring text splitter.
///
/// Sizes are measured in characters, not bytes; a cut never lands inside a
/// UTF-8 code point. The same input and parameters always yield the same
/// chunk sequence.
///
/// # Examples
///
/// ```
/// use ragline::chunker::TextChunker;
///
/// let chunker = TextChunker::new(40, 10).unwrap();
/// let chunks = chunker.split("First sentence here. Second sentence follows after it.");
/// assert!(chunks.len() > 1);
/// ```
#[derive(Debug, Clone)]
pub struct TextChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl TextChunker {
    /// Create a chunker with the given window size and overlap, both in
    /// characters.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Configuration`] unless
    /// `0 < chunk_overlap < chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, RagError> {
        if chunk_size == 0 {
            return Err(RagError::Configuration(
                "chunk_size must be strictly positive".to_string(),
            ));
        }
        if chunk_overlap == 0 {
            return Err(RagError::Configuration(
                "chunk_overlap must be strictly positive".to_string(),
            ));
        }
        if chunk_overlap >= chunk_size {
            return Err(RagError::Configuration(format!(
                "chunk_overlap ({chunk_overlap}) must be less than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    /// The configured window size in characters.
    #[must_use]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// The configured overlap in characters.
    #[must_use]
    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split `text` into overlapping chunks.
    ///
    /// Empty or whitespace-only input yields an empty `Vec`, not an error.
    /// For non-empty input the invariant holds that the first chunk plus the
    /// `chunk_overlap`-stripped tail of every following chunk reconstructs
    /// `text` exactly.
    #[must_use]
    pub fn split(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let chars: Vec<char> = text.chars().collect();
        // offsets[i] is the byte offset of character i; offsets[n] == text.len().
        let mut offsets: Vec<usize> = text.char_indices().map(|(byte, _)| byte).collect();
        offsets.push(text.len());
        let n_chars = chars.len();

        let mut chunks = Vec::new();
        let mut start = 0usize;
        loop {
            let window_end = (start + self.chunk_size).min(n_chars);
            let end = if window_end == n_chars {
                n_chars
            } else {
                self.cut_point(&chars, start, window_end)
            };
            chunks.push(text[offsets[start]..offsets[end]].to_string());
            if end == n_chars {
                break;
            }
            // Invariant: end > start + chunk_overlap, so this always advances.
            start = end - self.chunk_overlap;
        }
        chunks
    }

    /// Pick the cut position within `(start + overlap, window_end]`.
    ///
    /// Preference order: last sentence/paragraph terminator, then last
    /// whitespace edge, then the raw window end. The floor keeps every chunk
    /// strictly longer than the overlap so the split always makes progress.
    fn cut_point(&self, chars: &[char], start: usize, window_end: usize) -> usize {
        let floor = start + self.chunk_overlap + 1;

        for pos in (floor..=window_end).rev() {
            if SENTENCE_TERMINATORS.contains(&chars[pos - 1]) {
                return pos;
            }
        }
        for pos in (floor..=window_end).rev() {
            let before_is_space = chars[pos - 1].is_whitespace();
            let at_is_space = chars.get(pos).is_some_and(|c| c.is_whitespace());
            if before_is_space || at_is_space {
                return pos;
            }
        }
        window_end
    }
}
