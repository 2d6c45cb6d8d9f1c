//! Split chunk types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A bounded, ordered text segment produced by the splitter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Trimmed chunk text, never empty.
    pub text: String,
    /// Position within the split document, starting at 1.
    pub ordinal: u32,
    /// Metadata inherited from the document.
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl Chunk {
    /// Creates a chunk with empty metadata.
    pub fn new(text: impl Into<String>, ordinal: u32) -> Self {
        Self {
            text: text.into(),
            ordinal,
            metadata: Map::new(),
        }
    }

    /// Sets the metadata.
    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }
}
