//! Capabilities consumed by the retrieval and generation pipeline.
//!
//! Each trait is a black box from the pipeline's point of view: embedding
//! and generation hide the provider's wire protocol, and template rendering
//! hides where prompt text comes from.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

use crate::{ChatMessage, Cost, Result, UsageRecord};

/// Whether text is embedded for storage or for lookup.
///
/// Providers may preprocess the two differently (for example with distinct
/// instruction prefixes or input types).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(AsRefStr, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EmbeddingMode {
    /// Text being indexed.
    Document,
    /// Text of a search query.
    Query,
}

/// Vectors produced by one embedding call, in input order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Embeddings {
    /// One vector per input text.
    pub vectors: Vec<Vec<f32>>,
    /// Accounting for the call.
    pub usage: UsageRecord,
}

impl Embeddings {
    /// Returns the first vector, if any was produced.
    pub fn first(&self) -> Option<&[f32]> {
        self.vectors.first().map(Vec::as_slice).filter(|v| !v.is_empty())
    }

    /// Returns true if no usable vector was produced.
    pub fn is_empty(&self) -> bool {
        self.first().is_none()
    }
}

/// Output of a single generation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Generation {
    /// Generated text.
    pub text: String,
    /// Total tokens billed for the call.
    pub total_tokens: u64,
    /// Cost of the call.
    pub cost: Cost,
}

/// Turns texts into fixed-width vectors.
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    /// Width of every vector this service produces.
    fn dimensions(&self) -> usize;

    /// Embeds `texts` in the given mode.
    async fn embed(&self, texts: &[String], mode: EmbeddingMode) -> Result<Embeddings>;
}

/// Produces a completion for a prompt and a prior chat history.
///
/// Implementations own their retry policy; callers invoke them once.
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Generates a response to `prompt`, sent as a user message after `history`.
    async fn generate(&self, prompt: &str, history: &[ChatMessage]) -> Result<Generation>;
}

/// Resolves a named template and substitutes variables into it.
pub trait TemplateRenderer: Send + Sync {
    /// Renders `namespace`/`key` with the given `(name, value)` variables.
    fn render(&self, namespace: &str, key: &str, vars: &[(&str, String)]) -> Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embeddings_first() {
        let empty = Embeddings::default();
        assert!(empty.is_empty());

        let blank = Embeddings {
            vectors: vec![vec![]],
            usage: UsageRecord::default(),
        };
        assert!(blank.is_empty());

        let one = Embeddings {
            vectors: vec![vec![0.5, 0.5]],
            usage: UsageRecord::default(),
        };
        assert_eq!(one.first(), Some(&[0.5, 0.5][..]));
    }

    #[test]
    fn test_mode_display() {
        assert_eq!(EmbeddingMode::Document.to_string(), "document");
        assert_eq!(EmbeddingMode::Query.as_ref(), "query");
    }
}
