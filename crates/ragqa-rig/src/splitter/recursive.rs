//! Recursive, token-aware text splitting.

use std::collections::VecDeque;

use serde_json::{Map, Value};

use super::{Chunk, SharedCounter, TiktokenCounter, TokenCounter};
use crate::{Error, Result, TRACING_TARGET_SPLITTER};

/// Default separator cascade: paragraph, line, sentence-final punctuation,
/// space, then anywhere.
pub const DEFAULT_SEPARATORS: [&str; 7] = ["\n\n", "\n", ".", "?", "!", " ", ""];

/// Default maximum chunk length in tokens.
pub const DEFAULT_CHUNK_SIZE: usize = 100;

/// Default number of tokens repeated between consecutive chunks.
pub const DEFAULT_CHUNK_OVERLAP: usize = 20;

/// Splits documents into bounded, overlapping chunks.
///
/// Text is cut on the first separator of the cascade that occurs in it, and
/// any piece still longer than `chunk_size` tokens is cut again with the
/// remaining separators. The empty separator cuts between characters. The
/// pieces are then packed greedily, in document order, into chunks of at most
/// `chunk_size` tokens.
///
/// Each new chunk starts with the last `overlap` tokens of its predecessor:
/// the trailing pieces that fit whole, topped up with a suffix of the piece
/// before them cut on a finer separator.
///
/// ```rust
/// use ragqa_rig::splitter::TextSplitter;
///
/// let splitter = TextSplitter::new(50, 10)?;
/// let chunks = splitter.split("First paragraph.\n\nSecond paragraph.");
/// assert_eq!(chunks[0].ordinal, 1);
/// # Ok::<(), ragqa_rig::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    overlap: usize,
    separators: Vec<String>,
    keep_separator: bool,
    counter: SharedCounter,
}

/// A run of text that fits in a chunk or cannot be cut any further.
#[derive(Debug, Clone, Copy)]
struct Piece<'a> {
    text: &'a str,
    tokens: usize,
    /// Separator removed between this piece and the next one.
    joiner: &'a str,
    joiner_tokens: usize,
    /// Index of the first separator finer than the one that produced the piece.
    finer: usize,
}

impl TextSplitter {
    /// Creates a splitter with the default separators, measuring length in
    /// `cl100k_base` tokens.
    ///
    /// Fails unless `overlap < chunk_size`.
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size <= overlap {
            return Err(Error::config(format!(
                "chunk size {chunk_size} must exceed overlap {overlap}"
            )));
        }

        Ok(Self {
            chunk_size,
            overlap,
            separators: DEFAULT_SEPARATORS.iter().map(ToString::to_string).collect(),
            keep_separator: true,
            counter: SharedCounter::new(TiktokenCounter::cl100k()?),
        })
    }

    /// Replaces the separator cascade.
    pub fn with_separators<S: Into<String>>(
        mut self,
        separators: impl IntoIterator<Item = S>,
    ) -> Self {
        self.separators = separators.into_iter().map(Into::into).collect();
        self
    }

    /// Sets whether separators stay attached to the piece before them.
    pub fn with_keep_separator(mut self, keep_separator: bool) -> Self {
        self.keep_separator = keep_separator;
        self
    }

    /// Replaces the length function.
    pub fn with_counter(mut self, counter: impl TokenCounter + 'static) -> Self {
        self.counter = SharedCounter::new(counter);
        self
    }

    /// Returns the maximum chunk length in tokens.
    #[inline]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Returns the overlap in tokens.
    #[inline]
    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Returns the separator cascade.
    #[inline]
    pub fn separators(&self) -> &[String] {
        &self.separators
    }

    /// Returns the token length of `text`.
    #[inline]
    pub fn token_count(&self, text: &str) -> usize {
        self.counter.count(text)
    }

    /// Splits `text` into chunks numbered from 1.
    pub fn split(&self, text: &str) -> Vec<Chunk> {
        self.split_with_metadata(text, &Map::new())
    }

    /// Splits `text`, copying `metadata` onto every chunk.
    #[tracing::instrument(skip_all, target = TRACING_TARGET_SPLITTER, fields(text_len = text.len()))]
    pub fn split_with_metadata(&self, text: &str, metadata: &Map<String, Value>) -> Vec<Chunk> {
        let mut pieces = Vec::new();
        self.atomize(text, 0, "", &mut pieces);

        let chunks: Vec<Chunk> = self
            .merge(&pieces)
            .into_iter()
            .zip(1..)
            .map(|(text, ordinal)| Chunk::new(text, ordinal).with_metadata(metadata.clone()))
            .collect();

        tracing::debug!(
            target: TRACING_TARGET_SPLITTER,
            piece_count = pieces.len(),
            chunk_count = chunks.len(),
            chunk_size = self.chunk_size,
            overlap = self.overlap,
            "Split text into chunks"
        );

        chunks
    }

    /// Cuts `text` down the cascade, starting at `depth`, until every piece
    /// fits or no separator is left.
    fn atomize<'a>(
        &'a self,
        text: &'a str,
        depth: usize,
        joiner: &'a str,
        pieces: &mut Vec<Piece<'a>>,
    ) {
        let tokens = self.counter.count(text);
        let found = if tokens > self.chunk_size {
            self.separators[depth..]
                .iter()
                .position(|sep| sep.is_empty() || text.contains(sep.as_str()))
        } else {
            None
        };

        let Some(offset) = found else {
            pieces.push(Piece {
                text,
                tokens,
                joiner,
                joiner_tokens: self.counter.count(joiner),
                finer: depth,
            });
            return;
        };

        let index = depth + offset;
        let separator = self.separators[index].as_str();
        let parts = split_on(text, separator, self.keep_separator);
        let last = parts.len().saturating_sub(1);

        for (i, part) in parts.into_iter().enumerate() {
            let part_joiner = match (i == last, self.keep_separator) {
                (true, _) => joiner,
                (false, true) => "",
                (false, false) => separator,
            };
            self.atomize(part, index + 1, part_joiner, pieces);
        }
    }

    /// Packs pieces into chunks, seeding each chunk with the tail of the
    /// previous one.
    fn merge(&self, pieces: &[Piece<'_>]) -> Vec<String> {
        let mut merged = Vec::new();
        let mut window: VecDeque<Piece<'_>> = VecDeque::new();
        let mut total = 0;

        for &piece in pieces {
            let joint = window.back().map_or(0, |last| last.joiner_tokens);
            if !window.is_empty() && total + joint + piece.tokens > self.chunk_size {
                push_joined(&mut merged, &window);
                total = self.carry_over(&mut window, total, &piece);
            }

            if let Some(last) = window.back() {
                total += last.joiner_tokens;
            }
            total += piece.tokens;
            window.push_back(piece);
        }

        push_joined(&mut merged, &window);
        merged
    }

    /// Shrinks a closed chunk to the overlap carried into the next one and
    /// returns its token length.
    fn carry_over<'a>(
        &self,
        window: &mut VecDeque<Piece<'a>>,
        mut total: usize,
        next: &Piece<'a>,
    ) -> usize {
        let fits = |window: &VecDeque<Piece<'a>>, total: usize| {
            let joint = window.back().map_or(0, |last| last.joiner_tokens);
            total <= self.overlap && total + joint + next.tokens <= self.chunk_size
        };

        let mut dropped = None;
        while !window.is_empty() && !fits(&*window, total) {
            let Some(front) = window.pop_front() else {
                break;
            };
            total = if window.is_empty() {
                0
            } else {
                total.saturating_sub(front.tokens + front.joiner_tokens)
            };
            dropped = Some(front);
        }

        let Some(dropped) = dropped else {
            return total;
        };

        let (kept, joint) = match window.back() {
            Some(last) => (dropped.joiner_tokens + total, last.joiner_tokens),
            None => (0, dropped.joiner_tokens),
        };
        let budget = self
            .overlap
            .saturating_sub(kept)
            .min(self.chunk_size.saturating_sub(kept + joint + next.tokens));
        if budget == 0 {
            return total;
        }

        let tail = self.tail(dropped.text, budget, &self.separators[dropped.finer..]);
        let tokens = self.counter.count(tail);
        if tokens == 0 || tail.trim().is_empty() {
            return total;
        }

        let had_pieces = !window.is_empty();
        window.push_front(Piece {
            text: tail,
            tokens,
            ..dropped
        });

        if had_pieces {
            total + tokens + dropped.joiner_tokens
        } else {
            tokens
        }
    }

    /// Returns the longest suffix of `text` that begins right after one of
    /// `separators` and is at most `budget` tokens long.
    ///
    /// The empty separator is skipped, so the suffix never starts inside a word.
    fn tail<'t>(&self, text: &'t str, budget: usize, separators: &[String]) -> &'t str {
        let mut best = "";
        let mut best_tokens = 0;

        for separator in separators.iter().filter(|sep| !sep.is_empty()) {
            for (start, matched) in text.rmatch_indices(separator.as_str()) {
                let suffix = &text[start + matched.len()..];
                let tokens = self.counter.count(suffix);
                if tokens > budget {
                    break;
                }
                if tokens > best_tokens {
                    best = suffix;
                    best_tokens = tokens;
                }
            }

            if best_tokens == budget {
                break;
            }
        }

        best
    }
}

fn split_on<'a>(text: &'a str, separator: &str, keep_separator: bool) -> Vec<&'a str> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect();
    }

    let pieces: Vec<&str> = if keep_separator {
        text.split_inclusive(separator).collect()
    } else {
        text.split(separator).collect()
    };

    pieces.into_iter().filter(|p| !p.is_empty()).collect()
}

fn push_joined(merged: &mut Vec<String>, window: &VecDeque<Piece<'_>>) {
    let mut joined = String::new();
    for (i, piece) in window.iter().enumerate() {
        joined.push_str(piece.text);
        if i + 1 < window.len() {
            joined.push_str(piece.joiner);
        }
    }

    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        merged.push(trimmed.to_owned());
    }
}

#[cfg(test)]
mod tests {
    use std::ops::RangeInclusive;

    use serde_json::json;

    use super::*;
    use crate::splitter::{CharCounter, WordCounter};

    fn words(text: &str) -> Vec<&str> {
        text.split_whitespace().collect()
    }

    fn word_splitter(chunk_size: usize, overlap: usize) -> TextSplitter {
        TextSplitter::new(chunk_size, overlap)
            .unwrap()
            .with_separators(["\n\n", ".", " "])
            .with_counter(WordCounter)
    }

    fn numbered(range: RangeInclusive<usize>) -> String {
        range.map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ")
    }

    /// Three paragraphs of 90, 60 and 50 distinct words.
    fn three_paragraphs() -> String {
        [numbered(1..=90), numbered(91..=150), numbered(151..=200)].join("\n\n")
    }

    /// Eleven distinct words and a period: 12 tokens.
    fn sentence(k: usize) -> String {
        let words: Vec<_> = (1..=11).map(|w| format!("s{k}w{w}")).collect();
        format!("{}.", words.join(" "))
    }

    /// Paragraphs of 5, 6 and 5 sentences.
    fn prose() -> String {
        let paragraph =
            |range: RangeInclusive<usize>| range.map(sentence).collect::<Vec<_>>().join(" ");
        [paragraph(1..=5), paragraph(6..=11), paragraph(12..=16)].join("\n\n")
    }

    /// Concatenates chunks, dropping the longest prefix of each chunk that
    /// repeats the end of the text rebuilt so far.
    fn rebuild(chunks: &[Chunk]) -> Vec<&str> {
        let mut rebuilt: Vec<&str> = Vec::new();
        for chunk in chunks {
            let current = words(&chunk.text);
            let shared = (0..=current.len().min(rebuilt.len()))
                .rev()
                .find(|&k| rebuilt.ends_with(&current[..k]))
                .unwrap_or(0);
            rebuilt.extend_from_slice(&current[shared..]);
        }
        rebuilt
    }

    #[test]
    fn test_rejects_overlap_not_below_chunk_size() {
        assert!(matches!(TextSplitter::new(10, 10), Err(Error::Config(_))));
        assert!(matches!(TextSplitter::new(10, 20), Err(Error::Config(_))));
        assert!(matches!(TextSplitter::new(0, 0), Err(Error::Config(_))));
        assert!(TextSplitter::new(10, 9).is_ok());
    }

    #[test]
    fn test_empty_and_blank_input() {
        let splitter = TextSplitter::new(10, 2).unwrap();
        assert!(splitter.split("").is_empty());
        assert!(splitter.split(" \n\n \t ").is_empty());
    }

    #[test]
    fn test_short_text_is_one_chunk() {
        let splitter = TextSplitter::new(100, 20).unwrap();
        let chunks = splitter.split("  Hello there.\nGeneral Kenobi!  ");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Hello there.\nGeneral Kenobi!");
        assert_eq!(chunks[0].ordinal, 1);
    }

    #[test]
    fn test_sentence_prose_carries_overlap() {
        let text = prose();
        let splitter = word_splitter(50, 10);
        assert_eq!(splitter.token_count(&text), 192);

        let chunks = splitter.split(&text);
        assert_eq!(chunks.len(), 5);
        assert!(chunks.iter().all(|c| splitter.token_count(&c.text) <= 50));

        // Every successor opens with the last 9 words and the period of the
        // sentence that closed its predecessor.
        for pair in chunks.windows(2) {
            let prev = words(&pair[0].text);
            let next = words(&pair[1].text);
            assert_eq!(&next[..9], &prev[prev.len() - 9..]);
            assert_eq!(splitter.token_count(&next[..9].join(" ")), 10);
        }

        assert!(chunks[0].text.starts_with("s1w1 "));
        assert!(chunks[0].text.ends_with("s4w11."));
        assert!(chunks[1].text.starts_with("s4w3 "));
        assert!(chunks[4].text.ends_with("s16w11."));
        assert_eq!(rebuild(&chunks), words(&text));
    }

    #[test]
    fn test_paragraph_cascade_with_overlap() {
        let text = three_paragraphs();
        let splitter = word_splitter(50, 10);
        assert_eq!(splitter.token_count(&text), 200);

        let chunks = splitter.split(&text);
        assert_eq!(chunks.len(), 5);
        assert!(chunks.iter().all(|c| splitter.token_count(&c.text) <= 50));

        for pair in chunks[..4].windows(2) {
            let prev = words(&pair[0].text);
            let next = words(&pair[1].text);
            assert_eq!(&next[..10], &prev[prev.len() - 10..]);
        }

        // The last paragraph fits a chunk on its own, leaving no room to repeat.
        assert!(chunks[3].text.ends_with("w150"));
        assert_eq!(chunks[4].text, numbered(151..=200));
    }

    #[test]
    fn test_overlap_removal_reconstructs_content() {
        let text = three_paragraphs();
        let chunks = word_splitter(50, 10).split(&text);
        assert_eq!(rebuild(&chunks), words(&text));

        let text = prose();
        let chunks = word_splitter(30, 7).split(&text);
        assert_eq!(rebuild(&chunks), words(&text));
    }

    #[test]
    fn test_overlap_without_kept_separator() {
        let text = prose();
        let splitter = word_splitter(50, 10).with_keep_separator(false);
        let chunks = splitter.split(&text);

        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| splitter.token_count(&c.text) <= 50));
        // Dropped periods come back as joiners, so compare raw text.
        for pair in chunks.windows(2) {
            let last_word = words(&pair[0].text).last().copied().unwrap();
            assert!(pair[1].text.contains(last_word), "{:?} lost the overlap", pair[1].text);
        }
    }

    #[test]
    fn test_ordinals_are_contiguous() {
        let text = "Alpha beta gamma. Delta epsilon? Zeta eta theta!\n".repeat(30);
        let splitter = TextSplitter::new(12, 3).unwrap();
        let chunks = splitter.split(&text);

        assert!(chunks.len() > 1);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.ordinal as usize, i + 1);
            assert!(!chunk.text.is_empty());
            assert_eq!(chunk.text, chunk.text.trim());
        }
    }

    #[test]
    fn test_chunks_never_exceed_size() {
        let text = "The quick brown fox jumps over the lazy dog. Pack my box with five dozen \
                    liquor jugs!\n\nHow vexingly quick daft zebras jump? Sphinx of black \
                    quartz, judge my vow.\nAbcdefghijklmnopqrstuvwxyz"
            .repeat(4);

        for chunk_size in [3, 5, 8, 13, 21] {
            for overlap in [0, 1, chunk_size / 2, chunk_size - 1] {
                let splitter = TextSplitter::new(chunk_size, overlap)
                    .unwrap()
                    .with_counter(WordCounter);
                for chunk in splitter.split(&text) {
                    assert!(
                        WordCounter.count(&chunk.text) <= chunk_size,
                        "chunk {:?} exceeds {chunk_size} tokens",
                        chunk.text
                    );
                }
            }
        }
    }

    #[test]
    fn test_default_counter_bounds_bpe_tokens() {
        let text = "Tokenization of antidisestablishmentarianism, internationalization and \
                    electroencephalography splits words into several pieces. "
            .repeat(8);
        let splitter = TextSplitter::new(20, 5).unwrap();
        let bpe = TiktokenCounter::cl100k().unwrap();

        let chunks = splitter.split(&text);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(bpe.count(&chunk.text) <= 20, "chunk {:?} too long", chunk.text);
        }
    }

    #[test]
    fn test_deterministic() {
        let text = prose();
        let splitter = TextSplitter::new(30, 7).unwrap();
        assert_eq!(splitter.split(&text), splitter.split(&text));
    }

    #[test]
    fn test_without_keep_separator() {
        let splitter = TextSplitter::new(2, 0)
            .unwrap()
            .with_separators([" "])
            .with_keep_separator(false)
            .with_counter(WordCounter);
        let texts: Vec<_> = splitter.split("a b c d").into_iter().map(|c| c.text).collect();
        assert_eq!(texts, ["a b", "c d"]);
    }

    #[test]
    fn test_oversized_unit_is_emitted_alone() {
        let splitter = TextSplitter::new(3, 1)
            .unwrap()
            .with_separators([" "])
            .with_counter(CharCounter);
        let texts: Vec<_> = splitter.split("abcdef gh").into_iter().map(|c| c.text).collect();
        assert_eq!(texts, ["abcdef", "gh"]);
    }

    #[test]
    fn test_hard_cut_respects_char_boundaries() {
        let splitter = TextSplitter::new(4, 1).unwrap().with_counter(CharCounter);
        let chunks = splitter.split("ééééééééé");
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.text.chars().count() <= 4));
    }

    #[test]
    fn test_metadata_is_copied() {
        let metadata = json!({"source": "/docs/a.txt"});
        let metadata = metadata.as_object().unwrap();
        let splitter = TextSplitter::new(5, 1).unwrap().with_counter(WordCounter);
        let chunks = splitter.split_with_metadata("one two three four five six seven", metadata);

        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| &c.metadata == metadata));
    }
}
