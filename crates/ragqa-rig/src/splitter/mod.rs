//! Document chunking.
//!
//! [`TextSplitter`] cuts documents into ordered chunks bounded by a token
//! length function. The length function is pluggable through
//! [`TokenCounter`]; [`TiktokenCounter`] is the default, with
//! [`WordCounter`] and [`CharCounter`] as tokenizer-free alternatives.

mod chunk;
mod config;
mod recursive;
mod token;

pub use chunk::Chunk;
pub use config::ChunkingConfig;
pub use recursive::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE, DEFAULT_SEPARATORS, TextSplitter};
pub use token::{CharCounter, SharedCounter, TiktokenCounter, TokenCounter, WordCounter};
