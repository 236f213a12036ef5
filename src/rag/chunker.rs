//! Text chunking.
//!
//! Splits document text into overlapping windows of at most `chunk_size`
//! characters. Each window is cut at the most natural break point found in
//! it, trying in order:
//!
//! 1. a paragraph boundary (blank line)
//! 2. a sentence boundary (`.`, `!` or `?`, whitespace, then a capital letter)
//! 3. a clause boundary (`,` or `;` followed by whitespace)
//! 4. the start of the last whitespace run
//!
//! and falling back to a hard cut at `chunk_size`. Within each strategy the
//! candidate nearest the end of the window wins. Offsets are in characters,
//! not bytes.

use crate::types::{Chunk, Document, Metadata, RagError, Result};

/// Default maximum characters per chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 512;
/// Default characters shared between consecutive chunks.
pub const DEFAULT_CHUNK_OVERLAP: usize = 50;
/// Default separator.
pub const DEFAULT_SEPARATOR: &str = "\n";

/// Sliding-window text chunker.
#[derive(Debug, Clone)]
pub struct TextChunker {
    chunk_size: usize,
    chunk_overlap: usize,
    separator: String,
}

impl Default for TextChunker {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            separator: DEFAULT_SEPARATOR.to_string(),
        }
    }
}

impl TextChunker {
    /// Create a chunker.
    ///
    /// # Errors
    ///
    /// [`RagError::Configuration`] if `chunk_size` is zero or
    /// `chunk_overlap >= chunk_size`; such settings could never advance.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(RagError::Configuration(
                "chunk_size must be greater than 0".to_string(),
            ));
        }
        if chunk_overlap >= chunk_size {
            return Err(RagError::Configuration(format!(
                "chunk_overlap ({chunk_overlap}) must be smaller than chunk_size ({chunk_size})"
            )));
        }

        Ok(Self {
            chunk_size,
            chunk_overlap,
            separator: DEFAULT_SEPARATOR.to_string(),
        })
    }

    /// Set the separator. It is reported in configuration only and does not
    /// influence where chunks are cut.
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// Maximum characters per chunk.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Characters shared between consecutive chunks.
    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Configured separator.
    pub fn separator(&self) -> &str {
        &self.separator
    }

    /// Split `text` into chunks, each carrying its own copy of `metadata`
    /// extended with `chunk_index`, `start_idx` and `end_idx`.
    ///
    /// Empty text yields no chunks.
    pub fn chunk(&self, text: &str, metadata: &Metadata) -> Vec<Chunk> {
        let chars: Vec<char> = text.chars().collect();
        let len = chars.len();
        let mut chunks = Vec::new();
        let mut start = 0;

        while start < len {
            let end = if start + self.chunk_size >= len {
                len
            } else {
                let window = &chars[start..start + self.chunk_size];
                match find_break_point(window) {
                    // A break at offset 0 would produce an empty chunk
                    Some(bp) if bp > 0 => start + bp,
                    _ => start + self.chunk_size,
                }
            };

            let mut chunk_metadata = metadata.clone();
            chunk_metadata.insert("chunk_index", chunks.len());
            chunk_metadata.insert("start_idx", start);
            chunk_metadata.insert("end_idx", end);

            chunks.push(Chunk {
                text: chars[start..end].iter().collect(),
                metadata: chunk_metadata,
                start_idx: start,
                end_idx: end,
            });

            if end >= len {
                break;
            }

            // next start must move forward even when the break point fell inside the overlap
            let next = end.saturating_sub(self.chunk_overlap);
            start = if next > start { next } else { end };
        }

        chunks
    }

    /// Chunk a batch of documents.
    ///
    /// Each document's metadata copy is stamped with `doc_index`, the number
    /// of chunks emitted before that document. The caller's documents are not
    /// modified.
    pub fn chunk_documents(&self, documents: &[Document]) -> Vec<Chunk> {
        let mut all_chunks = Vec::new();

        for doc in documents {
            let mut metadata = doc.metadata.clone();
            metadata.insert("doc_index", all_chunks.len());
            all_chunks.extend(self.chunk(&doc.content, &metadata));
        }

        all_chunks
    }
}

/// Find where to end a window, as an offset into it.
fn find_break_point(window: &[char]) -> Option<usize> {
    paragraph_break(window)
        .or_else(|| sentence_break(window))
        .or_else(|| clause_break(window))
        .or_else(|| whitespace_break(window))
}

/// First newline of the last whitespace run holding at least two newlines.
fn paragraph_break(window: &[char]) -> Option<usize> {
    let mut i = window.len();
    while i > 0 {
        i -= 1;
        if !window[i].is_whitespace() {
            continue;
        }

        let run_end = i;
        while i > 0 && window[i - 1].is_whitespace() {
            i -= 1;
        }
        let run = &window[i..=run_end];
        if run.iter().filter(|c| **c == '\n').count() >= 2 {
            return run.iter().position(|c| *c == '\n').map(|p| i + p);
        }
    }
    None
}

/// Just after the last `.`/`!`/`?` that is followed by whitespace and an
/// uppercase ASCII letter.
fn sentence_break(window: &[char]) -> Option<usize> {
    (0..window.len())
        .rev()
        .find(|&p| {
            if !matches!(window[p], '.' | '!' | '?') {
                return false;
            }
            let rest = &window[p + 1..];
            let ws = rest.iter().take_while(|c| c.is_whitespace()).count();
            ws > 0 && rest.get(ws).is_some_and(|c| c.is_ascii_uppercase())
        })
        .map(|p| p + 1)
}

/// Just after the last `,`/`;` that is followed by whitespace.
fn clause_break(window: &[char]) -> Option<usize> {
    window
        .windows(2)
        .rposition(|pair| matches!(pair[0], ',' | ';') && pair[1].is_whitespace())
        .map(|p| p + 1)
}

/// Start of the last whitespace run.
fn whitespace_break(window: &[char]) -> Option<usize> {
    let last = window.iter().rposition(|c| c.is_whitespace())?;
    let run_len = window[..=last]
        .iter()
        .rev()
        .take_while(|c| c.is_whitespace())
        .count();
    Some(last + 1 - run_len)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn test_invalid_configuration() {
        assert!(matches!(TextChunker::new(0, 0), Err(RagError::Configuration(_))));
        assert!(matches!(TextChunker::new(100, 100), Err(RagError::Configuration(_))));
        assert!(matches!(TextChunker::new(100, 150), Err(RagError::Configuration(_))));
        assert!(TextChunker::new(100, 99).is_ok());
    }

    #[test]
    fn test_defaults() {
        let chunker = TextChunker::default();
        assert_eq!(chunker.chunk_size(), 512);
        assert_eq!(chunker.chunk_overlap(), 50);
        assert_eq!(chunker.separator(), "\n");
    }

    #[test]
    fn test_empty_text() {
        let chunker = TextChunker::default();
        assert!(chunker.chunk("", &Metadata::new()).is_empty());
    }

    #[test]
    fn test_short_text_is_single_chunk() {
        let chunker = TextChunker::new(100, 10).unwrap();
        let chunks = chunker.chunk("short text", &Metadata::new());
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "short text");
        assert_eq!((chunks[0].start_idx, chunks[0].end_idx), (0, 10));
    }

    #[test]
    fn test_paragraph_break_preferred() {
        let window = chars("First para. Still first.\n\nSecond, para text");
        assert_eq!(find_break_point(&window), Some(24));
    }

    #[test]
    fn test_paragraph_break_picks_last_blank_line() {
        let window = chars("a\n\nb\n \nc d");
        assert_eq!(paragraph_break(&window), Some(4));
        assert_eq!(paragraph_break(&chars("a\nb\nc")), None);
    }

    #[test]
    fn test_sentence_break() {
        let window = chars("One. Two! three? Four, five");
        assert_eq!(sentence_break(&window), Some(16));
        assert_eq!(sentence_break(&chars("One. Two! three")), Some(4));
        // lowercase after the period does not count
        assert_eq!(sentence_break(&chars("e.g. this, that")), None);
    }

    #[test]
    fn test_clause_and_whitespace_breaks() {
        let window = chars("alpha, beta; gamma delta");
        assert_eq!(sentence_break(&window), None);
        assert_eq!(clause_break(&window), Some(12));
        assert_eq!(whitespace_break(&chars("alpha beta   gamma")), Some(10));
        assert_eq!(whitespace_break(&chars("nowhitespace")), None);
    }

    #[test]
    fn test_hard_cut_scenario() {
        let text = "x".repeat(1000);
        let chunker = TextChunker::new(300, 50).unwrap();
        let chunks = chunker.chunk(&text, &Metadata::new());

        let starts: Vec<_> = chunks.iter().map(|c| c.start_idx).collect();
        assert_eq!(starts, vec![0, 250, 500, 750]);
        assert_eq!(chunks.last().unwrap().end_idx, 1000);
        assert!(chunks[..3].iter().all(|c| c.len() == 300));
    }

    #[test]
    fn test_break_at_offset_zero_falls_back_to_hard_cut() {
        // Whitespace run at the very start is the only break candidate.
        let text = format!(" {}", "y".repeat(20));
        let chunker = TextChunker::new(10, 2).unwrap();
        let chunks = chunker.chunk(&text, &Metadata::new());
        assert_eq!(chunks[0].end_idx, 10);
    }

    #[test]
    fn test_break_inside_overlap_still_advances() {
        let text = "a bbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";
        let chunker = TextChunker::new(10, 5).unwrap();
        let chunks = chunker.chunk(text, &Metadata::new());

        assert_eq!((chunks[0].start_idx, chunks[0].end_idx), (0, 1));
        assert_eq!(chunks[1].start_idx, 1);
        for pair in chunks.windows(2) {
            assert!(pair[1].start_idx > pair[0].start_idx);
            assert!(pair[1].start_idx <= pair[0].end_idx);
        }
        assert_eq!(chunks.last().unwrap().end_idx, text.chars().count());
    }

    #[test]
    fn test_multibyte_offsets_are_chars() {
        let text = "héllo wörld ünïcode façade naïve";
        let chunker = TextChunker::new(12, 3).unwrap();
        let chunks = chunker.chunk(text, &Metadata::new());
        let all: Vec<char> = text.chars().collect();

        for chunk in &chunks {
            let expected: String = all[chunk.start_idx..chunk.end_idx].iter().collect();
            assert_eq!(chunk.text, expected);
        }
    }

    #[test]
    fn test_chunk_metadata_is_independent_copy() {
        let chunker = TextChunker::new(20, 5).unwrap();
        let base = Metadata::from_pairs([("filename", "a.txt")]);
        let mut chunks = chunker.chunk("one two three four five six seven eight", &base);
        assert!(chunks.len() > 1);

        chunks[0].metadata.insert("filename", "changed.txt");
        assert_eq!(chunks[1].metadata.get_string("filename"), Some("a.txt"));
        assert_eq!(base.get_string("filename"), Some("a.txt"));
        assert_eq!(chunks[1].metadata.get_int("chunk_index"), Some(1));
        assert_eq!(
            chunks[1].metadata.get_int("start_idx"),
            Some(chunks[1].start_idx as i64)
        );
    }

    #[test]
    fn test_chunk_documents_stamps_doc_index() {
        let chunker = TextChunker::new(10, 2).unwrap();
        let docs = vec![
            Document::new("aaaa bbbb cccc dddd", Metadata::from_pairs([("filename", "1.txt")])),
            Document::new("short", Metadata::from_pairs([("filename", "2.txt")])),
        ];

        let chunks = chunker.chunk_documents(&docs);
        let first_doc_chunks = chunks
            .iter()
            .filter(|c| c.metadata.get_string("filename") == Some("1.txt"))
            .count();

        assert_eq!(chunks[0].metadata.get_int("doc_index"), Some(0));
        assert_eq!(
            chunks.last().unwrap().metadata.get_int("doc_index"),
            Some(first_doc_chunks as i64)
        );
        assert!(docs[0].metadata.get("doc_index").is_none());
    }
}
