//! Shared handles built once per invocation.

use std::sync::Arc;

use anyhow::Context as _;
use ragqa_core::{EmbeddingService, GenerationService};
use ragqa_postgres::{PgClient, PgConfig};
use ragqa_rig::provider::ProviderConfig;
use ragqa_rig::rag::{Generator, Indexer, Retriever, TemplateConfig};
use ragqa_rig::splitter::ChunkingConfig;
use ragqa_vector::{CollectionName, VectorStore, VectorStoreConfig};

/// Database pool, vector store and the configuration needed to build the
/// pipeline pieces a command asks for.
///
/// Providers are built on demand so that commands which never call a model
/// do not require its credentials.
pub struct Context {
    pg: PgClient,
    store: Arc<VectorStore>,
    provider: ProviderConfig,
    chunking: ChunkingConfig,
    templates: TemplateConfig,
}

impl Context {
    /// Creates the database pool and the vector store.
    pub fn new(
        postgres: PgConfig,
        vector: VectorStoreConfig,
        provider: ProviderConfig,
        chunking: ChunkingConfig,
        templates: TemplateConfig,
    ) -> anyhow::Result<Self> {
        let pg = postgres.build().context("failed to create database pool")?;
        let store =
            VectorStore::new(vector, Some(&pg)).context("failed to create vector store")?;

        Ok(Self {
            pg,
            store: Arc::new(store),
            provider,
            chunking,
            templates,
        })
    }

    /// Returns the database pool.
    pub fn pg(&self) -> &PgClient {
        &self.pg
    }

    /// Returns the vector store.
    pub fn store(&self) -> &VectorStore {
        &self.store
    }

    /// Returns the collection of a project at the configured embedding width.
    pub fn collection_name(&self, project_id: i32) -> anyhow::Result<CollectionName> {
        self.store
            .name_for(project_id, self.provider.embedding_model_size)
            .context("invalid collection name")
    }

    /// Builds the configured embedding provider.
    pub fn embedder(&self) -> anyhow::Result<Arc<dyn EmbeddingService>> {
        let provider = self
            .provider
            .embedding_provider()
            .context("failed to create embedding provider")?;
        Ok(Arc::new(provider))
    }

    /// Builds the configured generation provider.
    pub fn generation(&self) -> anyhow::Result<Arc<dyn GenerationService>> {
        let provider = self
            .provider
            .completion_provider()
            .context("failed to create generation provider")?;
        Ok(Arc::new(provider))
    }

    /// Builds the indexing pipeline.
    pub fn indexer(&self) -> anyhow::Result<Indexer> {
        let splitter = self.chunking.build().context("invalid chunking configuration")?;
        Ok(Indexer::new(
            self.pg.clone(),
            self.store.clone(),
            self.embedder()?,
            splitter,
        ))
    }

    /// Builds the retriever.
    pub fn retriever(&self) -> anyhow::Result<Retriever> {
        Ok(Retriever::new(self.store.clone(), self.embedder()?))
    }

    /// Builds the answer generator.
    pub fn generator(&self) -> anyhow::Result<Generator> {
        Ok(Generator::new(
            self.retriever()?,
            self.generation()?,
            Arc::new(self.templates.build()),
            self.provider.input_max_characters,
        ))
    }
}
