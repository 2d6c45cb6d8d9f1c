//! Embedding provider abstraction.

use std::sync::Arc;

use async_trait::async_trait;
use ragqa_core::{Cost, EmbeddingMode, EmbeddingService, Embeddings, UsageRecord};
use rig::client::Nothing;
use rig::embeddings::{Embedding, EmbeddingModel as RigEmbeddingModel};
use rig::prelude::EmbeddingsClient;
use rig::providers::{cohere, ollama, openai};
use serde::{Deserialize, Serialize};

use super::pricing::DEFAULT_EMBEDDING_PRICE_PER_MILLION;
use crate::splitter::{SharedCounter, TiktokenCounter, TokenCounter};
use crate::{Error, Result, TRACING_TARGET_PROVIDER};

/// Per-mode preprocessing and pricing applied around the model call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingOptions {
    /// Instruction prepended to documents.
    pub document_prefix: Option<String>,
    /// Instruction prepended to queries.
    pub query_prefix: Option<String>,
    /// US dollars per million input tokens.
    pub price_per_million: f64,
}

impl Default for EmbeddingOptions {
    fn default() -> Self {
        Self {
            document_prefix: None,
            query_prefix: None,
            price_per_million: DEFAULT_EMBEDDING_PRICE_PER_MILLION,
        }
    }
}

impl EmbeddingOptions {
    /// Returns `text` with the prefix configured for `mode`.
    pub fn apply(&self, mode: EmbeddingMode, text: &str) -> String {
        let prefix = match mode {
            EmbeddingMode::Document => self.document_prefix.as_deref(),
            EmbeddingMode::Query => self.query_prefix.as_deref(),
        };

        match prefix {
            Some(prefix) if !prefix.is_empty() => format!("{prefix}{text}"),
            _ => text.to_owned(),
        }
    }
}

/// Embedding provider that wraps different rig embedding model implementations.
///
/// Cloning is cheap; the model handles are shared.
#[derive(Clone)]
pub struct EmbeddingProvider {
    service: Arc<EmbeddingBackendModel>,
    ndims: usize,
    options: EmbeddingOptions,
    counter: SharedCounter,
}

enum EmbeddingBackendModel {
    OpenAi {
        model: openai::EmbeddingModel,
        model_name: String,
    },
    Cohere {
        document: cohere::EmbeddingModel,
        query: cohere::EmbeddingModel,
        model_name: String,
    },
    Ollama {
        client: ollama::Client,
        model_name: String,
    },
}

impl EmbeddingProvider {
    fn from_service(service: EmbeddingBackendModel, ndims: usize) -> Result<Self> {
        Ok(Self {
            service: Arc::new(service),
            ndims,
            options: EmbeddingOptions::default(),
            counter: SharedCounter::new(TiktokenCounter::cl100k()?),
        })
    }

    /// Creates an OpenAI embedding provider.
    pub fn openai(api_key: &str, model: &str, ndims: usize) -> Result<Self> {
        let client =
            openai::Client::new(api_key).map_err(|e| Error::provider("openai", e.to_string()))?;

        Self::from_service(
            EmbeddingBackendModel::OpenAi {
                model: client.embedding_model_with_ndims(model, ndims),
                model_name: model.to_owned(),
            },
            ndims,
        )
    }

    /// Creates a Cohere embedding provider.
    ///
    /// Documents are embedded with the `search_document` input type and
    /// queries with `search_query`.
    pub fn cohere(api_key: &str, model: &str, ndims: usize) -> Result<Self> {
        let client =
            cohere::Client::new(api_key).map_err(|e| Error::provider("cohere", e.to_string()))?;

        Self::from_service(
            EmbeddingBackendModel::Cohere {
                document: client.embedding_model_with_ndims(model, "search_document", ndims),
                query: client.embedding_model_with_ndims(model, "search_query", ndims),
                model_name: model.to_owned(),
            },
            ndims,
        )
    }

    /// Creates an Ollama embedding provider.
    pub fn ollama(base_url: &str, model: &str, ndims: usize) -> Result<Self> {
        let client = ollama::Client::builder()
            .api_key(Nothing)
            .base_url(base_url)
            .build()
            .map_err(|e| Error::provider("ollama", e.to_string()))?;

        Self::from_service(
            EmbeddingBackendModel::Ollama {
                client,
                model_name: model.to_owned(),
            },
            ndims,
        )
    }

    /// Sets the per-mode prefixes and price.
    pub fn with_options(mut self, options: EmbeddingOptions) -> Self {
        self.options = options;
        self
    }

    /// Replaces the counter used to estimate input tokens, `cl100k_base` by
    /// default.
    pub fn with_counter(mut self, counter: impl TokenCounter + 'static) -> Self {
        self.counter = SharedCounter::new(counter);
        self
    }

    /// Returns the model name.
    pub fn model_name(&self) -> &str {
        match self.service.as_ref() {
            EmbeddingBackendModel::OpenAi { model_name, .. } => model_name,
            EmbeddingBackendModel::Cohere { model_name, .. } => model_name,
            EmbeddingBackendModel::Ollama { model_name, .. } => model_name,
        }
    }

    /// Returns the provider name.
    pub fn provider_name(&self) -> &'static str {
        match self.service.as_ref() {
            EmbeddingBackendModel::OpenAi { .. } => "openai",
            EmbeddingBackendModel::Cohere { .. } => "cohere",
            EmbeddingBackendModel::Ollama { .. } => "ollama",
        }
    }

    async fn embed_with_model(
        &self,
        texts: Vec<String>,
        mode: EmbeddingMode,
    ) -> Result<Vec<Embedding>> {
        let result = match self.service.as_ref() {
            EmbeddingBackendModel::OpenAi { model, .. } => model.embed_texts(texts).await,
            EmbeddingBackendModel::Cohere { document, query, .. } => match mode {
                EmbeddingMode::Document => document.embed_texts(texts).await,
                EmbeddingMode::Query => query.embed_texts(texts).await,
            },
            EmbeddingBackendModel::Ollama { client, model_name } => {
                let model = ollama::EmbeddingModel::new(client.clone(), model_name, self.ndims);
                model.embed_texts(texts).await
            }
        };

        result.map_err(|e| Error::provider(self.provider_name(), e))
    }
}

#[async_trait]
impl EmbeddingService for EmbeddingProvider {
    fn dimensions(&self) -> usize {
        self.ndims
    }

    async fn embed(&self, texts: &[String], mode: EmbeddingMode) -> ragqa_core::Result<Embeddings> {
        if texts.is_empty() {
            return Ok(Embeddings::default());
        }

        let inputs: Vec<String> = texts.iter().map(|t| self.options.apply(mode, t)).collect();
        let prompt_tokens: u64 = inputs.iter().map(|t| self.counter.count(t) as u64).sum();

        let embeddings = self.embed_with_model(inputs, mode).await?;
        let vectors: Vec<Vec<f32>> = embeddings
            .into_iter()
            .map(|e| e.vec.into_iter().map(|x| x as f32).collect())
            .collect();

        if let Some(bad) = vectors.iter().find(|v| !v.is_empty() && v.len() != self.ndims) {
            return Err(Error::embedding(format!(
                "model {} returned {} dimensions, expected {}",
                self.model_name(),
                bad.len(),
                self.ndims
            ))
            .into());
        }

        let cost = Cost::per_million(prompt_tokens, self.options.price_per_million);
        tracing::debug!(
            target: TRACING_TARGET_PROVIDER,
            provider = self.provider_name(),
            model = self.model_name(),
            mode = %mode,
            texts = texts.len(),
            prompt_tokens,
            cost = %cost,
            "Embedded texts"
        );

        Ok(Embeddings {
            vectors,
            usage: UsageRecord::new(prompt_tokens, prompt_tokens, cost),
        })
    }
}

impl std::fmt::Debug for EmbeddingProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self.service.as_ref() {
            EmbeddingBackendModel::OpenAi { .. } => "EmbeddingProvider::OpenAi",
            EmbeddingBackendModel::Cohere { .. } => "EmbeddingProvider::Cohere",
            EmbeddingBackendModel::Ollama { .. } => "EmbeddingProvider::Ollama",
        };

        f.debug_struct(name)
            .field("model", &self.model_name())
            .field("ndims", &self.ndims)
            .finish()
    }
}
