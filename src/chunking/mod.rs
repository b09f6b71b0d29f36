//! Text chunking for indexing.
//!
//! Splits long text into overlapping, size-bounded chunks. Paragraph breaks
//! are preferred over line breaks, line breaks over sentence ends, sentence
//! ends over whitespace, and whitespace over raw character boundaries.
//! Chunk lengths are measured in characters, not bytes.

use crate::config::ChunkingSettings;
use crate::error::{Result, VidsageError};
use std::collections::VecDeque;
use std::ops::Range;

/// Default maximum chunk length in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Default number of characters repeated between consecutive chunks.
pub const DEFAULT_CHUNK_OVERLAP: usize = 100;

/// Separator cascade, coarsest first. Past the last level text is split into
/// single characters.
const SEPARATOR_LEVELS: &[&[&str]] = &[&["\n\n"], &["\n"], &[". ", "! ", "? "], &[" "]];

/// Configuration for chunking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    /// Maximum chunk length in characters.
    pub chunk_size: usize,
    /// Maximum characters carried into the next chunk.
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl From<&ChunkingSettings> for ChunkingConfig {
    fn from(settings: &ChunkingSettings) -> Self {
        Self {
            chunk_size: settings.chunk_size,
            overlap: settings.chunk_overlap,
        }
    }
}

/// Recursive character text splitter.
///
/// Every chunk is an exact substring of the input. Consecutive chunks share
/// up to `overlap` characters, cut at the coarsest boundary that fits and
/// never inside a word, so the input can always be rebuilt from
/// [`TextSplitter::split_spans`]. The overlap is empty only when the word at
/// the end of a chunk is longer than the budget.
#[derive(Debug, Clone)]
pub struct TextSplitter {
    config: ChunkingConfig,
}

impl TextSplitter {
    /// Create a splitter with the given chunk size and overlap.
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        Self::with_config(ChunkingConfig {
            chunk_size,
            overlap,
        })
    }

    /// Create a splitter from a chunking configuration.
    pub fn with_config(config: ChunkingConfig) -> Result<Self> {
        if config.chunk_size == 0 {
            return Err(VidsageError::Configuration(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if config.overlap >= config.chunk_size {
            return Err(VidsageError::Configuration(format!(
                "chunk overlap ({}) must be smaller than chunk_size ({})",
                config.overlap, config.chunk_size
            )));
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> ChunkingConfig {
        self.config
    }

    /// Split text into chunks.
    pub fn split(&self, text: &str) -> Vec<String> {
        self.split_spans(text)
            .into_iter()
            .map(|span| text[span].to_string())
            .collect()
    }

    /// Split text into chunks, returning the byte range of each chunk.
    pub fn split_spans(&self, text: &str) -> Vec<Range<usize>> {
        if text.is_empty() {
            return Vec::new();
        }
        self.split_range(text, 0..text.len(), 0)
    }

    fn split_range(&self, text: &str, range: Range<usize>, level: usize) -> Vec<Range<usize>> {
        let mut spans = Vec::new();
        let mut fitting: Vec<Range<usize>> = Vec::new();

        for piece in split_pieces(text, range, level) {
            if char_len(text, &piece) <= self.config.chunk_size {
                fitting.push(piece);
                continue;
            }

            if !fitting.is_empty() {
                spans.extend(self.merge(text, &fitting, level));
                fitting.clear();
            }
            spans.extend(self.split_range(text, piece, level + 1));
        }

        if !fitting.is_empty() {
            spans.extend(self.merge(text, &fitting, level));
        }

        spans
    }

    /// Greedily merge contiguous pieces into chunks, carrying the end of each
    /// chunk into the next one as overlap.
    fn merge(&self, text: &str, pieces: &[Range<usize>], level: usize) -> Vec<Range<usize>> {
        let ChunkingConfig {
            chunk_size,
            overlap,
        } = self.config;

        let mut spans = Vec::new();
        let mut window: VecDeque<(Range<usize>, usize)> = VecDeque::new();
        let mut total = 0usize;

        for piece in pieces {
            let len = char_len(text, piece);

            if total + len > chunk_size && !window.is_empty() {
                spans.push(window_span(&window));

                let budget = overlap.min(chunk_size - len);
                window = overlap_tail(text, &window, budget, level);
                total = window.iter().map(|(_, l)| l).sum();
            }

            window.push_back((piece.clone(), len));
            total += len;
        }

        if !window.is_empty() {
            spans.push(window_span(&window));
        }

        spans
    }
}

impl Default for TextSplitter {
    fn default() -> Self {
        Self {
            config: ChunkingConfig::default(),
        }
    }
}

/// Split `range` into contiguous pieces at the separators of `level`.
///
/// Separators stay attached to the end of the piece they terminate.
fn split_pieces(text: &str, range: Range<usize>, level: usize) -> Vec<Range<usize>> {
    let start = range.start;
    let slice = &text[range.clone()];

    let Some(separators) = SEPARATOR_LEVELS.get(level) else {
        return slice
            .char_indices()
            .map(|(i, c)| start + i..start + i + c.len_utf8())
            .collect();
    };

    let mut cuts: Vec<usize> = separators
        .iter()
        .flat_map(|sep| slice.match_indices(sep).map(|(i, m)| start + i + m.len()))
        .collect();
    cuts.sort_unstable();
    cuts.dedup();

    let mut pieces = Vec::with_capacity(cuts.len() + 1);
    let mut prev = start;
    for cut in cuts {
        if cut > prev {
            pieces.push(prev..cut);
            prev = cut;
        }
    }
    if prev < range.end {
        pieces.push(prev..range.end);
    }

    pieces
}

/// The longest suffix of `window` within `budget` characters.
///
/// Whole pieces are kept while they fit; the first piece that does not is
/// cut again at finer separators.
fn overlap_tail(
    text: &str,
    window: &VecDeque<(Range<usize>, usize)>,
    budget: usize,
    level: usize,
) -> VecDeque<(Range<usize>, usize)> {
    let mut tail = VecDeque::new();
    let mut total = 0;

    for (piece, len) in window.iter().rev() {
        if total + len <= budget {
            tail.push_front((piece.clone(), *len));
            total += len;
            continue;
        }
        for part in trailing_pieces(text, piece.clone(), budget - total, level + 1)
            .into_iter()
            .rev()
        {
            tail.push_front(part);
        }
        break;
    }

    tail
}

/// Trailing pieces of `range`, in order, totalling at most `budget` characters.
///
/// Stops at the whitespace level, so words are never cut.
fn trailing_pieces(
    text: &str,
    range: Range<usize>,
    budget: usize,
    level: usize,
) -> Vec<(Range<usize>, usize)> {
    if budget == 0 || level >= SEPARATOR_LEVELS.len() {
        return Vec::new();
    }

    let mut out = Vec::new();
    let mut total = 0;
    for piece in split_pieces(text, range, level).into_iter().rev() {
        let len = char_len(text, &piece);
        if total + len <= budget {
            out.push((piece, len));
            total += len;
            continue;
        }
        let finer = trailing_pieces(text, piece, budget - total, level + 1);
        out.extend(finer.into_iter().rev());
        break;
    }

    out.reverse();
    out
}

fn window_span(window: &VecDeque<(Range<usize>, usize)>) -> Range<usize> {
    match (window.front(), window.back()) {
        (Some((first, _)), Some((last, _))) => first.start..last.end,
        _ => 0..0,
    }
}

fn char_len(text: &str, range: &Range<usize>) -> usize {
    text[range.clone()].chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Rebuild the input by dropping each chunk's overlap with its predecessor.
    fn reconstruct(text: &str, spans: &[Range<usize>]) -> String {
        let mut out = String::new();
        let mut covered = 0;
        for span in spans {
            assert!(span.start <= covered, "gap before {:?}", span);
            out.push_str(&text[covered.max(span.start)..span.end]);
            covered = span.end;
        }
        out
    }

    fn sample_text() -> String {
        let mut text = String::new();
        for p in 0..12 {
            for s in 0..(3 + p % 5) {
                text.push_str(&format!(
                    "Paragraph {} sentence {} talks about retrieval and chunk boundaries. ",
                    p, s
                ));
            }
            text.push_str(if p % 3 == 0 { "\n" } else { "\n\n" });
        }
        text.push_str(&"unbroken".repeat(40));
        text
    }

    #[test]
    fn test_empty_input() {
        let splitter = TextSplitter::default();
        assert!(splitter.split("").is_empty());
    }

    #[test]
    fn test_short_input_is_single_chunk() {
        let splitter = TextSplitter::default();
        let chunks = splitter.split("A short note about Rust.");
        assert_eq!(chunks, vec!["A short note about Rust.".to_string()]);
    }

    #[test]
    fn test_chunk_size_bound() {
        let text = sample_text();
        for (size, overlap) in [(50, 10), (120, 30), (300, 0), (1000, 100), (7, 3)] {
            let splitter = TextSplitter::new(size, overlap).unwrap();
            let chunks = splitter.split(&text);
            assert!(!chunks.is_empty());
            for chunk in &chunks {
                assert!(
                    chunk.chars().count() <= size,
                    "chunk of {} chars exceeds {}",
                    chunk.chars().count(),
                    size
                );
            }
        }
    }

    #[test]
    fn test_overlap_is_bounded_prefix_of_next_chunk() {
        let text = sample_text();
        let splitter = TextSplitter::new(120, 30).unwrap();
        let spans = splitter.split_spans(&text);

        for pair in spans.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            assert!(next.start >= prev.start);
            assert!(next.end > prev.end);
            assert!(next.start <= prev.end);

            let shared = &text[next.start..prev.end];
            assert!(shared.chars().count() <= 30);
            assert!(text[prev.clone()].ends_with(shared));
            assert!(text[next.clone()].starts_with(shared));
        }
    }

    #[test]
    fn test_prose_chunks_overlap() {
        let mut text = String::new();
        for i in 0..40 {
            text.push_str(&format!(
                "Sentence {:02} explains how the retrieval pipeline splits long analysis reports into chunks for embedding later on. ",
                i
            ));
        }
        let splitter = TextSplitter::default();
        let spans = splitter.split_spans(&text);

        assert!(spans.len() > 1);
        for pair in spans.windows(2) {
            let shared = pair[0].end.saturating_sub(pair[1].start);
            assert!(shared > 0, "no overlap between {:?} and {:?}", pair[0], pair[1]);
            assert!(shared <= 100, "overlap of {} chars", shared);
            // Overlap starts on a word
            assert!(text[..pair[1].start].ends_with(' '));
        }
        assert_eq!(reconstruct(&text, &spans), text);
    }

    #[test]
    fn test_repeated_words_reconstruct_exactly() {
        let text = "word ".repeat(5000);
        let splitter = TextSplitter::default();
        let spans = splitter.split_spans(&text);

        assert_eq!(spans.len(), 28);
        assert_eq!(reconstruct(&text, &spans), text);

        for pair in spans.windows(2) {
            assert_eq!(pair[0].end - pair[1].start, 100);
        }
        let chunks = splitter.split(&text);
        assert!(chunks[..27].iter().all(|c| c.len() == 1000));
        assert_eq!(chunks[27].len(), 700);
    }

    #[test]
    fn test_sample_text_reconstructs_exactly() {
        let text = sample_text();
        for (size, overlap) in [(50, 10), (120, 30), (1000, 100)] {
            let splitter = TextSplitter::new(size, overlap).unwrap();
            let spans = splitter.split_spans(&text);
            assert_eq!(reconstruct(&text, &spans), text);
        }
    }

    #[test]
    fn test_prefers_paragraph_boundaries() {
        let text = format!("{}\n\n{}", "a".repeat(20), "b".repeat(20));
        let splitter = TextSplitter::new(30, 0).unwrap();
        let chunks = splitter.split(&text);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], format!("{}\n\n", "a".repeat(20)));
        assert_eq!(chunks[1], "b".repeat(20));
    }

    #[test]
    fn test_falls_back_to_sentences() {
        let text = "First sentence here. Second sentence here. Third sentence here.";
        let splitter = TextSplitter::new(25, 0).unwrap();
        let chunks = splitter.split(text);

        assert_eq!(
            chunks,
            vec![
                "First sentence here. ".to_string(),
                "Second sentence here. ".to_string(),
                "Third sentence here.".to_string(),
            ]
        );
    }

    #[test]
    fn test_unbroken_token_splits_on_characters() {
        let text = "x".repeat(25);
        let splitter = TextSplitter::new(10, 2).unwrap();
        let chunks = splitter.split(&text);

        assert!(chunks.iter().all(|c| c.len() <= 10));
        assert_eq!(chunks[0].len(), 10);
        assert_eq!(chunks.len(), 3);
    }

    #[test]
    fn test_multibyte_text_is_measured_in_chars() {
        let text = "héllo wörld ".repeat(30);
        let splitter = TextSplitter::new(40, 8).unwrap();
        let chunks = splitter.split(&text);

        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.chars().count() <= 40));
    }

    #[test]
    fn test_deterministic() {
        let text = sample_text();
        let splitter = TextSplitter::new(80, 20).unwrap();
        assert_eq!(splitter.split(&text), splitter.split(&text));
    }

    #[test]
    fn test_invalid_configuration() {
        assert!(matches!(
            TextSplitter::new(0, 0),
            Err(VidsageError::Configuration(_))
        ));
        assert!(matches!(
            TextSplitter::new(100, 100),
            Err(VidsageError::Configuration(_))
        ));
    }
}
