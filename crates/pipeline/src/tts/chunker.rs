//! Boundary-aware text segmentation for TTS
//!
//! Splits long text into chunks the synthesis backend can take in one call.
//! Sentences are packed greedily up to `max_chars`; a sentence that does not
//! fit alone is split at clause boundaries, then at word boundaries. A single
//! word longer than `max_chars` is emitted whole.
//!
//! All boundaries require trailing whitespace (or end of text), so chunks are
//! always contiguous slices of the input and no token is ever split.

use std::ops::Range;

/// Finest boundary used to produce a chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryKind {
    Sentence,
    Clause,
    Word,
    /// Single oversized token
    Hard,
}

/// Chunk output from the segmenter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    /// Position in the chunk sequence
    pub index: usize,
    /// The text to synthesize
    pub text: String,
    /// How the chunk was delimited
    pub boundary: BoundaryKind,
}

impl TextChunk {
    /// Length in characters
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Segmenter configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmenterConfig {
    /// Maximum characters per chunk
    pub max_chars: usize,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self { max_chars: 300 }
    }
}

/// Hierarchical greedy text segmenter
#[derive(Debug, Clone, Default)]
pub struct TextSegmenter {
    config: SegmenterConfig,
}

impl TextSegmenter {
    /// Create a new segmenter
    pub fn new(config: SegmenterConfig) -> Self {
        Self { config }
    }

    /// Segmenter with the given chunk limit
    pub fn with_max_chars(max_chars: usize) -> Self {
        Self::new(SegmenterConfig { max_chars })
    }

    pub fn max_chars(&self) -> usize {
        self.config.max_chars
    }

    /// Split `text` into ordered chunks. Never returns an empty list.
    pub fn segment(&self, text: &str) -> Vec<TextChunk> {
        segment(text, self.config.max_chars)
    }
}

/// Split `text` into ordered chunks of at most `max_chars` characters.
///
/// Never returns an empty list: blank input comes back as a single chunk.
pub fn segment(text: &str, max_chars: usize) -> Vec<TextChunk> {
    let trimmed = text.trim();

    if trimmed.is_empty() {
        return vec![TextChunk {
            index: 0,
            text: text.to_string(),
            boundary: BoundaryKind::Sentence,
        }];
    }

    if char_len(trimmed) <= max_chars {
        return vec![TextChunk {
            index: 0,
            text: trimmed.to_string(),
            boundary: BoundaryKind::Sentence,
        }];
    }

    let units = sentence_units(trimmed, 0..trimmed.len());
    let mut pieces = Vec::new();
    pack(trimmed, &units, max_chars, Level::Sentence, &mut pieces);

    let chunks: Vec<TextChunk> = pieces
        .into_iter()
        .filter(|(span, _)| !trimmed[span.clone()].trim().is_empty())
        .enumerate()
        .map(|(index, (span, boundary))| TextChunk {
            index,
            text: trimmed[span].trim().to_string(),
            boundary,
        })
        .collect();

    if chunks.is_empty() {
        return vec![TextChunk {
            index: 0,
            text: text.to_string(),
            boundary: BoundaryKind::Sentence,
        }];
    }

    chunks
}

#[derive(Debug, Clone, Copy)]
enum Level {
    Sentence,
    Clause,
    Word,
}

impl Level {
    fn kind(self) -> BoundaryKind {
        match self {
            Level::Sentence => BoundaryKind::Sentence,
            Level::Clause => BoundaryKind::Clause,
            Level::Word => BoundaryKind::Word,
        }
    }

    fn finer(self) -> Option<Level> {
        match self {
            Level::Sentence => Some(Level::Clause),
            Level::Clause => Some(Level::Word),
            Level::Word => None,
        }
    }

    fn split(self, text: &str, span: Range<usize>) -> Vec<Range<usize>> {
        match self {
            Level::Sentence => sentence_units(text, span),
            Level::Clause => clause_units(text, span),
            Level::Word => word_units(text, span),
        }
    }
}

/// Greedily pack `units` into spans of at most `max_chars`, recursing into
/// finer levels for units that do not fit alone.
fn pack(
    text: &str,
    units: &[Range<usize>],
    max_chars: usize,
    level: Level,
    out: &mut Vec<(Range<usize>, BoundaryKind)>,
) {
    let mut current: Option<Range<usize>> = None;

    for unit in units {
        if char_len(&text[unit.clone()]) > max_chars {
            if let Some(buffered) = current.take() {
                out.push((buffered, level.kind()));
            }

            match level.finer() {
                Some(finer) => {
                    let sub_units = finer.split(text, unit.clone());
                    pack(text, &sub_units, max_chars, finer, out);
                }
                None => out.push((unit.clone(), BoundaryKind::Hard)),
            }
            continue;
        }

        current = match current.take() {
            Some(buffered) if char_len(&text[buffered.start..unit.end]) <= max_chars => {
                Some(buffered.start..unit.end)
            }
            Some(buffered) => {
                out.push((buffered, level.kind()));
                Some(unit.clone())
            }
            None => Some(unit.clone()),
        };
    }

    if let Some(buffered) = current {
        out.push((buffered, level.kind()));
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn is_sentence_terminal(c: char) -> bool {
    matches!(c, '.' | '!' | '?' | '…' | '。' | '！' | '？')
}

/// Closing quotes and brackets that stay attached to a terminal
fn is_closer(c: char) -> bool {
    matches!(c, '"' | '\'' | '”' | '’' | '»' | ')' | ']' | '}' | '」' | '』')
}

fn is_clause_mark(c: char) -> bool {
    matches!(c, ',' | ';' | ':' | '，' | '；' | '：' | '、')
}

fn is_dash(c: char) -> bool {
    matches!(c, '—' | '–')
}

/// Sentence units within `span`. A unit ends after a run of terminal
/// punctuation (plus closers) followed by whitespace, or at a blank line.
fn sentence_units(text: &str, span: Range<usize>) -> Vec<Range<usize>> {
    let s = &text[span.clone()];
    let mut cuts = Vec::new();
    let mut chars = s.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if is_sentence_terminal(c) {
            let mut end = i + c.len_utf8();
            while let Some(&(j, next)) = chars.peek() {
                if is_sentence_terminal(next) || is_closer(next) {
                    end = j + next.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }
            match chars.peek() {
                None => cuts.push(end),
                Some(&(_, next)) if next.is_whitespace() => cuts.push(end),
                _ => {}
            }
        } else if c == '\n' {
            let mut newlines = 1;
            while let Some(&(_, next)) = chars.peek() {
                if !next.is_whitespace() {
                    break;
                }
                if next == '\n' {
                    newlines += 1;
                }
                chars.next();
            }
            if newlines >= 2 {
                cuts.push(i);
            }
        }
    }

    units_from_cuts(s, cuts, span.start)
}

/// Clause units within `span`: commas, semicolons, colons and dashes
/// followed by whitespace. A hyphen only counts when it stands alone.
fn clause_units(text: &str, span: Range<usize>) -> Vec<Range<usize>> {
    let s = &text[span.clone()];
    let mut cuts = Vec::new();
    let mut prev: Option<char> = None;
    let mut chars = s.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        let next_is_space = chars.peek().map_or(true, |&(_, n)| n.is_whitespace());
        let boundary = if is_clause_mark(c) || is_dash(c) {
            next_is_space
        } else if c == '-' {
            next_is_space && prev.map_or(false, char::is_whitespace)
        } else {
            false
        };

        if boundary {
            cuts.push(i + c.len_utf8());
        }
        prev = Some(c);
    }

    units_from_cuts(s, cuts, span.start)
}

/// Whitespace-delimited tokens within `span`
fn word_units(text: &str, span: Range<usize>) -> Vec<Range<usize>> {
    let s = &text[span.clone()];
    let mut units = Vec::new();
    let mut start: Option<usize> = None;

    for (i, c) in s.char_indices() {
        if c.is_whitespace() {
            if let Some(st) = start.take() {
                units.push(span.start + st..span.start + i);
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }

    if let Some(st) = start {
        units.push(span.start + st..span.end);
    }

    units
}

/// Turn cut offsets (relative to `s`) into trimmed, non-empty units offset
/// by `base`.
fn units_from_cuts(s: &str, cuts: Vec<usize>, base: usize) -> Vec<Range<usize>> {
    let mut units = Vec::new();
    let mut start = 0;

    for cut in cuts.into_iter().chain(std::iter::once(s.len())) {
        if cut <= start {
            continue;
        }
        if let Some(unit) = trim_span(s, start..cut) {
            units.push(base + unit.start..base + unit.end);
        }
        start = cut;
    }

    units
}

fn trim_span(s: &str, span: Range<usize>) -> Option<Range<usize>> {
    let piece = &s[span.clone()];
    let trimmed = piece.trim();
    if trimmed.is_empty() {
        return None;
    }
    let lead = piece.len() - piece.trim_start().len();
    let start = span.start + lead;
    Some(start..start + trimmed.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(chunks: &[TextChunk]) -> Vec<&str> {
        chunks.iter().map(|c| c.text.as_str()).collect()
    }

    fn tokens(s: &str) -> Vec<&str> {
        s.split_whitespace().collect()
    }

    #[test]
    fn test_short_text_single_chunk() {
        let chunks = segment("  Hello there.  ", 50);
        assert_eq!(texts(&chunks), vec!["Hello there."]);
        assert_eq!(chunks[0].boundary, BoundaryKind::Sentence);
        assert_eq!(chunks[0].index, 0);
    }

    #[test]
    fn test_empty_text_returns_input() {
        assert_eq!(texts(&segment("", 10)), vec![""]);
        assert_eq!(texts(&segment("   ", 10)), vec!["   "]);
    }

    #[test]
    fn test_sentence_split() {
        let chunks = segment("Hello world. This is a test.", 15);
        assert_eq!(texts(&chunks), vec!["Hello world.", "This is a test."]);
        assert!(chunks.iter().all(|c| c.boundary == BoundaryKind::Sentence));
    }

    #[test]
    fn test_oversized_token_emitted_whole() {
        let chunks = segment("Supercalifragilisticexpialidocious", 10);
        assert_eq!(texts(&chunks), vec!["Supercalifragilisticexpialidocious"]);
        assert_eq!(chunks[0].boundary, BoundaryKind::Hard);
    }

    #[test]
    fn test_sentences_packed_greedily() {
        let chunks = segment("One. Two. Three. Four.", 10);
        assert_eq!(texts(&chunks), vec!["One. Two.", "Three.", "Four."]);
    }

    #[test]
    fn test_question_and_exclamation() {
        let chunks = segment("Are you there? Yes I am! Good to know.", 16);
        assert_eq!(
            texts(&chunks),
            vec!["Are you there?", "Yes I am!", "Good to know."]
        );
    }

    #[test]
    fn test_closing_quote_stays_with_sentence() {
        let chunks = segment("He said \"stop.\" Then he left.", 16);
        assert_eq!(texts(&chunks), vec!["He said \"stop.\"", "Then he left."]);
    }

    #[test]
    fn test_decimal_point_is_not_boundary() {
        let chunks = segment("Pi is 3.14159 roughly. Next one.", 22);
        assert_eq!(texts(&chunks), vec!["Pi is 3.14159 roughly.", "Next one."]);
    }

    #[test]
    fn test_newline_after_terminal() {
        let chunks = segment("First line.\nSecond line.", 12);
        assert_eq!(texts(&chunks), vec!["First line.", "Second line."]);
    }

    #[test]
    fn test_blank_line_is_boundary() {
        let chunks = segment("Heading without stop\n\nBody text here", 20);
        assert_eq!(texts(&chunks), vec!["Heading without stop", "Body text here"]);
    }

    #[test]
    fn test_clause_fallback() {
        let text = "When the rain stopped, we walked to the river, and then we went home.";
        let chunks = segment(text, 30);
        assert_eq!(
            texts(&chunks),
            vec![
                "When the rain stopped,",
                "we walked to the river,",
                "and then we went home."
            ]
        );
        assert!(chunks.iter().all(|c| c.boundary == BoundaryKind::Clause));
    }

    #[test]
    fn test_em_dash_clause() {
        let chunks = segment("The answer was clear— nobody had noticed it at all.", 25);
        assert_eq!(chunks[0].text, "The answer was clear—");
        assert_eq!(chunks[0].boundary, BoundaryKind::Clause);
    }

    #[test]
    fn test_no_punctuation_falls_to_words() {
        let chunks = segment("alpha beta gamma delta epsilon", 12);
        assert_eq!(texts(&chunks), vec!["alpha beta", "gamma delta", "epsilon"]);
        assert!(chunks.iter().all(|c| c.boundary == BoundaryKind::Word));
    }

    #[test]
    fn test_unicode_counted_in_chars() {
        // 11 chars, 22 bytes
        let chunks = segment("ééééé ééééé", 11);
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn test_full_width_terminals() {
        let chunks = segment("你好。 世界很大。", 5);
        assert_eq!(texts(&chunks), vec!["你好。", "世界很大。"]);
    }

    #[test]
    fn test_indices_contiguous() {
        let text = "a b c d e f g h i j k l m n o p. q r s t u v w x y z.";
        let chunks = segment(text, 8);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.index, i);
        }
    }

    #[test]
    fn test_length_bound_and_token_preservation() {
        let text = "The quick brown fox jumps over the lazy dog. Pack my box with five \
                    dozen liquor jugs; how vexingly quick daft zebras jump! \
                    Sphinx of black quartz, judge my vow — extraordinarily \
                    incomprehensibilities notwithstanding.\n\nThe end";
        for max in [1, 5, 10, 17, 32, 64, 200] {
            let chunks = segment(text, max);
            assert!(!chunks.is_empty());
            for chunk in &chunks {
                assert!(!chunk.text.is_empty());
                assert!(
                    chunk.char_len() <= max || tokens(&chunk.text).len() == 1,
                    "chunk {:?} exceeds {}",
                    chunk.text,
                    max
                );
            }
            let rejoined = texts(&chunks).join(" ");
            assert_eq!(tokens(&rejoined), tokens(text));
        }
    }

    #[test]
    fn test_deterministic() {
        let text = "Some text, with clauses; and sentences. Another one here!";
        assert_eq!(segment(text, 12), segment(text, 12));
    }

    #[test]
    fn test_segmenter_config() {
        let segmenter = TextSegmenter::with_max_chars(15);
        assert_eq!(segmenter.max_chars(), 15);
        assert_eq!(segmenter.segment("Hello world. This is a test.").len(), 2);
        assert_eq!(TextSegmenter::default().max_chars(), 300);
    }
}
