//! Model providers.
//!
//! [`EmbeddingProvider`] and [`CompletionProvider`] adapt OpenAI, Cohere and
//! Ollama models from rig to the `ragqa-core` capability traits. The backend
//! is chosen once from [`ProviderConfig`].

mod completion;
mod config;
mod embedding;
pub mod pricing;
mod text;

pub use completion::{CompletionProvider, GenerationSettings};
pub use config::{EmbeddingBackend, GenerationBackend, ProviderConfig};
pub use embedding::{EmbeddingOptions, EmbeddingProvider};
pub use text::process_text;
