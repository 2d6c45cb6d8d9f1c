//! Provider selection and settings.

use std::fmt;

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use super::pricing::DEFAULT_EMBEDDING_PRICE_PER_MILLION;
use super::{CompletionProvider, EmbeddingOptions, EmbeddingProvider, GenerationSettings};
use crate::{Error, Result};

/// Backend answering generation requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(AsRefStr, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum GenerationBackend {
    /// OpenAI chat completions.
    #[default]
    #[serde(rename = "openai")]
    #[strum(serialize = "openai")]
    OpenAi,
    /// Cohere chat.
    Cohere,
    /// Local Ollama server.
    Ollama,
}

/// Backend producing embeddings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(AsRefStr, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum EmbeddingBackend {
    /// OpenAI embeddings.
    #[default]
    #[serde(rename = "openai")]
    #[strum(serialize = "openai")]
    OpenAi,
    /// Cohere embeddings with search input types.
    Cohere,
    /// Local Ollama server.
    Ollama,
}

/// Generation and embedding provider configuration.
///
/// Backends are chosen once, when the providers are built.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct ProviderConfig {
    /// Generation backend (openai, cohere or ollama)
    #[cfg_attr(
        feature = "config",
        arg(long = "generation-backend", env = "GENERATION_BACKEND", default_value = "openai")
    )]
    pub generation_backend: GenerationBackend,

    /// Embedding backend (openai, cohere or ollama)
    #[cfg_attr(
        feature = "config",
        arg(long = "embedding-backend", env = "EMBEDDING_BACKEND", default_value = "openai")
    )]
    pub embedding_backend: EmbeddingBackend,

    /// OpenAI API key
    #[cfg_attr(feature = "config", arg(long = "openai-api-key", env = "OPENAI_API_KEY"))]
    pub openai_api_key: Option<String>,

    /// Cohere API key
    #[cfg_attr(feature = "config", arg(long = "cohere-api-key", env = "COHERE_API_KEY"))]
    pub cohere_api_key: Option<String>,

    /// Ollama server URL
    #[cfg_attr(
        feature = "config",
        arg(
            long = "ollama-base-url",
            env = "OLLAMA_BASE_URL",
            default_value = "http://localhost:11434"
        )
    )]
    pub ollama_base_url: String,

    /// Generation model identifier
    #[cfg_attr(
        feature = "config",
        arg(long = "generation-model-id", env = "GENERATION_MODEL_ID", default_value = "gpt-4.1-mini")
    )]
    pub generation_model_id: String,

    /// Embedding model identifier
    #[cfg_attr(
        feature = "config",
        arg(
            long = "embedding-model-id",
            env = "EMBEDDING_MODEL_ID",
            default_value = "text-embedding-3-small"
        )
    )]
    pub embedding_model_id: String,

    /// Width of the vectors produced by the embedding model
    #[cfg_attr(
        feature = "config",
        arg(long = "embedding-model-size", env = "EMBEDDING_MODEL_SIZE", default_value = "1536")
    )]
    pub embedding_model_size: usize,

    /// Characters of each retrieved document kept in the prompt
    #[cfg_attr(
        feature = "config",
        arg(
            long = "input-max-characters",
            env = "INPUT_DEFAULT_MAX_CHARACTERS",
            default_value = "500"
        )
    )]
    pub input_max_characters: usize,

    /// Maximum tokens generated per answer
    #[cfg_attr(
        feature = "config",
        arg(
            long = "generation-max-tokens",
            env = "GENERATION_DEFAULT_MAX_TOKENS",
            default_value = "1000"
        )
    )]
    pub generation_max_tokens: u64,

    /// Sampling temperature, ignored by models that do not accept one
    #[cfg_attr(
        feature = "config",
        arg(
            long = "generation-temperature",
            env = "GENERATION_DEFAULT_TEMPERATURE",
            default_value = "0.1"
        )
    )]
    pub generation_temperature: f64,

    /// Embedding price in US dollars per million tokens
    #[cfg_attr(
        feature = "config",
        arg(
            long = "embedding-price-per-million",
            env = "EMBEDDING_PRICE_PER_MILLION",
            default_value = "0.02"
        )
    )]
    pub embedding_price_per_million: f64,

    /// Instruction prefixed to documents before embedding
    #[cfg_attr(
        feature = "config",
        arg(long = "embedding-document-prefix", env = "EMBEDDING_DOCUMENT_PREFIX")
    )]
    pub embedding_document_prefix: Option<String>,

    /// Instruction prefixed to queries before embedding
    #[cfg_attr(
        feature = "config",
        arg(long = "embedding-query-prefix", env = "EMBEDDING_QUERY_PREFIX")
    )]
    pub embedding_query_prefix: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            generation_backend: GenerationBackend::default(),
            embedding_backend: EmbeddingBackend::default(),
            openai_api_key: None,
            cohere_api_key: None,
            ollama_base_url: "http://localhost:11434".to_owned(),
            generation_model_id: "gpt-4.1-mini".to_owned(),
            embedding_model_id: "text-embedding-3-small".to_owned(),
            embedding_model_size: 1536,
            input_max_characters: 500,
            generation_max_tokens: 1000,
            generation_temperature: 0.1,
            embedding_price_per_million: DEFAULT_EMBEDDING_PRICE_PER_MILLION,
            embedding_document_prefix: None,
            embedding_query_prefix: None,
        }
    }
}

impl ProviderConfig {
    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.generation_model_id.trim().is_empty() {
            return Err(Error::config("generation model id cannot be empty"));
        }

        if self.embedding_model_id.trim().is_empty() {
            return Err(Error::config("embedding model id cannot be empty"));
        }

        if self.embedding_model_size == 0 {
            return Err(Error::config("embedding model size must be positive"));
        }

        if self.input_max_characters == 0 {
            return Err(Error::config("input max characters must be positive"));
        }

        if self.generation_max_tokens == 0 {
            return Err(Error::config("generation max tokens must be positive"));
        }

        if !(0.0..=2.0).contains(&self.generation_temperature) {
            return Err(Error::config(format!(
                "generation temperature {} must be between 0 and 2",
                self.generation_temperature
            )));
        }

        if self.embedding_price_per_million < 0.0 {
            return Err(Error::config("embedding price cannot be negative"));
        }

        Ok(())
    }

    /// Returns the generation settings.
    pub fn generation_settings(&self) -> GenerationSettings {
        GenerationSettings {
            max_tokens: self.generation_max_tokens,
            temperature: self.generation_temperature,
        }
    }

    /// Returns the embedding options.
    pub fn embedding_options(&self) -> EmbeddingOptions {
        EmbeddingOptions {
            document_prefix: self.embedding_document_prefix.clone(),
            query_prefix: self.embedding_query_prefix.clone(),
            price_per_million: self.embedding_price_per_million,
        }
    }

    /// Builds the configured embedding provider.
    pub fn embedding_provider(&self) -> Result<EmbeddingProvider> {
        self.validate()?;
        let model = self.embedding_model_id.as_str();
        let ndims = self.embedding_model_size;

        let provider = match self.embedding_backend {
            EmbeddingBackend::OpenAi => {
                EmbeddingProvider::openai(self.openai_key()?, model, ndims)?
            }
            EmbeddingBackend::Cohere => {
                EmbeddingProvider::cohere(self.cohere_key()?, model, ndims)?
            }
            EmbeddingBackend::Ollama => {
                EmbeddingProvider::ollama(&self.ollama_base_url, model, ndims)?
            }
        };

        Ok(provider.with_options(self.embedding_options()))
    }

    /// Builds the configured generation provider.
    pub fn completion_provider(&self) -> Result<CompletionProvider> {
        self.validate()?;
        let model = self.generation_model_id.as_str();

        let provider = match self.generation_backend {
            GenerationBackend::OpenAi => CompletionProvider::openai(self.openai_key()?, model)?,
            GenerationBackend::Cohere => CompletionProvider::cohere(self.cohere_key()?, model)?,
            GenerationBackend::Ollama => {
                CompletionProvider::ollama(&self.ollama_base_url, model)?
            }
        };

        Ok(provider.with_settings(self.generation_settings()))
    }

    fn openai_key(&self) -> Result<&str> {
        require_key(self.openai_api_key.as_deref(), "OPENAI_API_KEY")
    }

    fn cohere_key(&self) -> Result<&str> {
        require_key(self.cohere_api_key.as_deref(), "COHERE_API_KEY")
    }
}

fn require_key<'a>(key: Option<&'a str>, variable: &str) -> Result<&'a str> {
    key.filter(|k| !k.trim().is_empty())
        .ok_or_else(|| Error::config(format!("{variable} is required by the selected backend")))
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let masked = |key: &Option<String>| key.as_ref().map(|_| "****");

        f.debug_struct("ProviderConfig")
            .field("generation_backend", &self.generation_backend)
            .field("embedding_backend", &self.embedding_backend)
            .field("openai_api_key", &masked(&self.openai_api_key))
            .field("cohere_api_key", &masked(&self.cohere_api_key))
            .field("ollama_base_url", &self.ollama_base_url)
            .field("generation_model_id", &self.generation_model_id)
            .field("embedding_model_id", &self.embedding_model_id)
            .field("embedding_model_size", &self.embedding_model_size)
            .field("input_max_characters", &self.input_max_characters)
            .field("generation_max_tokens", &self.generation_max_tokens)
            .field("generation_temperature", &self.generation_temperature)
            .field("embedding_price_per_million", &self.embedding_price_per_million)
            .finish_non_exhaustive()
    }
}
