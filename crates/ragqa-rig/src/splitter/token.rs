//! Length functions measured in token units.

use std::fmt;
use std::sync::{Arc, OnceLock};

use tiktoken_rs::CoreBPE;

use crate::{Error, Result};

/// Measures text length in token units.
pub trait TokenCounter: Send + Sync {
    /// Returns the number of tokens in `text`.
    fn count(&self, text: &str) -> usize;
}

impl<F> TokenCounter for F
where
    F: Fn(&str) -> usize + Send + Sync,
{
    fn count(&self, text: &str) -> usize {
        self(text)
    }
}

/// Counts byte-pair tokens of the `cl100k_base` encoding used by OpenAI
/// embedding and chat models.
#[derive(Clone)]
pub struct TiktokenCounter {
    bpe: Arc<CoreBPE>,
}

impl TiktokenCounter {
    /// Loads the `cl100k_base` ranks, once per process.
    pub fn cl100k() -> Result<Self> {
        static CL100K: OnceLock<Arc<CoreBPE>> = OnceLock::new();

        if let Some(bpe) = CL100K.get() {
            return Ok(Self { bpe: bpe.clone() });
        }

        let bpe = tiktoken_rs::cl100k_base()
            .map_err(|e| Error::config(format!("failed to load cl100k_base: {e}")))?;
        let bpe = CL100K.get_or_init(|| Arc::new(bpe)).clone();
        Ok(Self { bpe })
    }
}

impl TokenCounter for TiktokenCounter {
    fn count(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }
}

impl fmt::Debug for TiktokenCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TiktokenCounter(cl100k_base)")
    }
}

/// Pre-tokenizer style counter: every run of alphanumeric characters is one
/// token and every other non-whitespace character is a token of its own.
///
/// Counting a concatenation never yields more tokens than counting its parts
/// separately.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordCounter;

impl TokenCounter for WordCounter {
    fn count(&self, text: &str) -> usize {
        let mut tokens = 0;
        let mut in_word = false;

        for c in text.chars() {
            if c.is_alphanumeric() || c == '_' {
                if !in_word {
                    tokens += 1;
                    in_word = true;
                }
            } else {
                in_word = false;
                if !c.is_whitespace() {
                    tokens += 1;
                }
            }
        }

        tokens
    }
}

/// Counts Unicode scalar values.
#[derive(Debug, Clone, Copy, Default)]
pub struct CharCounter;

impl TokenCounter for CharCounter {
    fn count(&self, text: &str) -> usize {
        text.chars().count()
    }
}

/// Shared, type-erased token counter.
#[derive(Clone)]
pub struct SharedCounter(Arc<dyn TokenCounter>);

impl SharedCounter {
    /// Wraps a counter.
    pub fn new(counter: impl TokenCounter + 'static) -> Self {
        Self(Arc::new(counter))
    }
}

impl TokenCounter for SharedCounter {
    #[inline]
    fn count(&self, text: &str) -> usize {
        self.0.count(text)
    }
}

impl fmt::Debug for SharedCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedCounter")
    }
}
