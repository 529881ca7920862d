//! Sliding-window text chunker.
//!
//! Chunks are measured in characters of the extracted text. Consecutive
//! chunks share a fixed overlap region, computed as a sliding window so
//! the shared suffix/prefix is deterministic and the windows cover the
//! whole text with no gaps.

use insight_types::ChunkingConfig;

/// One chunk span before embedding: text plus character offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkSpan {
    pub ordinal: usize,
    pub text: String,
    /// Character offset of the span start
    pub start: usize,
    /// Character offset one past the span end
    pub end: usize,
}

/// Splits text into overlapping windows.
#[derive(Debug, Clone)]
pub struct Chunker {
    config: ChunkingConfig,
}

impl Chunker {
    /// Create a chunker from a validated configuration.
    pub fn new(config: ChunkingConfig) -> Self {
        Self { config }
    }

    /// Split text into chunk spans.
    ///
    /// Offsets are character offsets, not byte offsets, so multi-byte
    /// text never splits inside a code point. Text no longer than one
    /// window yields a single span.
    pub fn split(&self, text: &str) -> Vec<ChunkSpan> {
        let chars: Vec<char> = text.chars().collect();
        let len = chars.len();
        if len == 0 {
            return Vec::new();
        }

        let window = self.config.window.max(1);
        // Degenerate configs that slip past validation (overlap >= window)
        // still advance at least one char per window.
        let step = window.saturating_sub(self.config.overlap).max(1);

        let mut spans = Vec::new();
        let mut start = 0usize;
        let mut ordinal = 0usize;

        loop {
            let end = (start + window).min(len);
            spans.push(ChunkSpan {
                ordinal,
                text: chars[start..end].iter().collect(),
                start,
                end,
            });

            if end == len {
                break;
            }
            start += step;
            ordinal += 1;
        }

        spans
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunker(window: usize, overlap: usize) -> Chunker {
        Chunker::new(ChunkingConfig { window, overlap })
    }

    #[test]
    fn test_short_text_is_one_chunk() {
        let spans = chunker(100, 20).split("short text");
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].text, "short text");
        assert_eq!(spans[0].start, 0);
        assert_eq!(spans[0].end, 10);
    }

    #[test]
    fn test_empty_text_yields_no_chunks() {
        assert!(chunker(100, 20).split("").is_empty());
    }

    #[test]
    fn test_windows_cover_text_with_no_gaps() {
        let text: String = ('a'..='z').cycle().take(2500).collect();
        let spans = chunker(1000, 200).split(&text);

        assert_eq!(spans[0].start, 0);
        assert_eq!(spans.last().unwrap().end, 2500);
        for pair in spans.windows(2) {
            // Next chunk starts inside the previous one: overlap, no gap.
            assert_eq!(pair[1].start, pair[0].end - 200);
        }
    }

    #[test]
    fn test_consecutive_chunks_share_deterministic_overlap() {
        let text: String = ('a'..='z').cycle().take(300).collect();
        let spans = chunker(100, 30).split(&text);

        for pair in spans.windows(2) {
            let suffix: String = pair[0].text.chars().skip(70).collect();
            let prefix: String = pair[1].text.chars().take(30).collect();
            assert_eq!(suffix, prefix);
        }
    }

    #[test]
    fn test_chunk_count_matches_sliding_window_formula() {
        // ceil((L - O) / (C - O)) for L > C
        let cases = [(2500usize, 1000usize, 200usize), (5000, 500, 50), (1001, 1000, 200)];
        for (len, window, overlap) in cases {
            let text: String = "x".repeat(len);
            let spans = chunker(window, overlap).split(&text);
            let expected = (len - overlap).div_ceil(window - overlap);
            assert_eq!(spans.len(), expected, "len={len} window={window} overlap={overlap}");
        }
    }

    #[test]
    fn test_multibyte_text_splits_on_char_boundaries() {
        let text: String = "héllo wörld ".repeat(30);
        let spans = chunker(50, 10).split(&text);

        let total_chars = text.chars().count();
        assert_eq!(spans.last().unwrap().end, total_chars);
        for span in &spans {
            assert_eq!(span.text.chars().count(), span.end - span.start);
        }
    }

    #[test]
    fn test_overlap_at_least_window_still_terminates() {
        let text = "x".repeat(25);

        let spans = chunker(10, 10).split(&text);
        assert_eq!(spans.len(), 16);
        assert_eq!(spans.last().unwrap().end, 25);

        let spans = chunker(10, 12).split(&text);
        assert_eq!(spans.last().unwrap().end, 25);
        for pair in spans.windows(2) {
            assert_eq!(pair[1].start, pair[0].start + 1);
        }
    }

    #[test]
    fn test_ordinals_are_sequential() {
        let text = "x".repeat(450);
        let spans = chunker(100, 25).split(&text);
        for (i, span) in spans.iter().enumerate() {
            assert_eq!(span.ordinal, i);
        }
    }
}
