//! Chunking configuration.

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};

use super::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE, TextSplitter};
use crate::Result;

/// Sizing applied when documents are processed into chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct ChunkingConfig {
    /// Maximum chunk length in tokens
    #[cfg_attr(
        feature = "config",
        arg(long = "chunk-size", env = "FILE_DEFAULT_CHUNK_SIZE", default_value = "100")
    )]
    pub chunk_size: usize,

    /// Tokens repeated at the start of each following chunk
    #[cfg_attr(
        feature = "config",
        arg(long = "chunk-overlap", env = "FILE_DEFAULT_CHUNK_OVERLAP", default_value = "20")
    )]
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl ChunkingConfig {
    /// Validates the sizing.
    pub fn validate(&self) -> Result<()> {
        self.build().map(|_| ())
    }

    /// Creates a splitter with this sizing and the default separators.
    pub fn build(&self) -> Result<TextSplitter> {
        TextSplitter::new(self.chunk_size, self.chunk_overlap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_builds() {
        let splitter = ChunkingConfig::default().build().unwrap();
        assert_eq!(splitter.chunk_size(), 100);
        assert_eq!(splitter.overlap(), 20);
        assert_eq!(splitter.separators().len(), 7);
    }

    #[test]
    fn test_validate() {
        let config = ChunkingConfig {
            chunk_size: 20,
            chunk_overlap: 20,
        };
        assert!(config.validate().is_err());
    }
}
