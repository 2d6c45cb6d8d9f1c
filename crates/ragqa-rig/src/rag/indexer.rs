//! Document processing and collection indexing.

use std::sync::Arc;

use ragqa_core::{EmbeddingMode, EmbeddingService, Embeddings, UsageRecord};
use ragqa_postgres::model::{Chunk as StoredChunk, NewChunk};
use ragqa_postgres::query::ChunkRepository;
use ragqa_postgres::{OffsetPagination, PgClient, sanitize_text};
use ragqa_vector::{CollectionName, VectorItem, VectorStore};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::splitter::{Chunk, TextSplitter};
use crate::{Error, Result, TRACING_TARGET_RAG};

/// Persisted chunks embedded per round trip.
pub const DEFAULT_PAGE_SIZE: i64 = 50;

/// Outcome of processing one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessSummary {
    /// Owning project.
    pub project_id: i32,
    /// Document name recorded on each chunk.
    pub asset_name: String,
    /// Chunks removed before processing.
    pub chunks_deleted: usize,
    /// Chunks written.
    pub chunks_inserted: usize,
}

/// Outcome of pushing a project's chunks into its collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PushSummary {
    /// Target collection.
    pub collection: CollectionName,
    /// Whether this call created the collection.
    pub collection_created: bool,
    /// Vector rows written.
    pub rows_inserted: usize,
    /// Pages of chunks embedded.
    pub pages: usize,
    /// Whether an insert built the acceleration index.
    pub index_created: bool,
    /// Embedding usage summed over every page.
    pub usage: UsageRecord,
}

/// Splits documents into persisted chunks and indexes them into vector
/// collections.
#[derive(Clone)]
pub struct Indexer {
    pg: PgClient,
    store: Arc<VectorStore>,
    embedder: Arc<dyn EmbeddingService>,
    splitter: TextSplitter,
    page_size: i64,
}

impl Indexer {
    /// Creates an indexer.
    pub fn new(
        pg: PgClient,
        store: Arc<VectorStore>,
        embedder: Arc<dyn EmbeddingService>,
        splitter: TextSplitter,
    ) -> Self {
        Self {
            pg,
            store,
            embedder,
            splitter,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Sets how many chunks are embedded per round trip.
    pub fn with_page_size(mut self, page_size: i64) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Returns the collection backing a project at the embedder's width.
    pub fn collection_name(&self, project_id: i32) -> Result<CollectionName> {
        Ok(self.store.name_for(project_id, self.embedder.dimensions())?)
    }

    /// Splits `text` and persists the chunks under `asset_name`.
    ///
    /// With `reset`, the project's existing chunks (and the collection rows
    /// referencing them) are deleted first.
    #[tracing::instrument(skip(self, text, metadata), target = TRACING_TARGET_RAG, fields(text_len = text.len()))]
    pub async fn process(
        &self,
        project_id: i32,
        asset_name: &str,
        text: &str,
        metadata: Map<String, Value>,
        reset: bool,
    ) -> Result<ProcessSummary> {
        let chunks = self.splitter.split_with_metadata(text, &metadata);
        let new_chunks = to_new_chunks(project_id, asset_name, chunks);

        let mut conn = self.pg.get_connection().await?;
        let chunks_deleted = match reset {
            true => conn.delete_project_chunks(project_id).await?,
            false => 0,
        };
        let chunks_inserted = conn.create_chunks(new_chunks).await?;

        tracing::info!(
            target: TRACING_TARGET_RAG,
            chunks_deleted,
            chunks_inserted,
            "Processed document"
        );

        Ok(ProcessSummary {
            project_id,
            asset_name: asset_name.to_owned(),
            chunks_deleted,
            chunks_inserted,
        })
    }

    /// Embeds a project's persisted chunks in document mode and inserts them
    /// into its collection, creating (or with `reset`, recreating) it first.
    ///
    /// A connection is held only while a page is read.
    #[tracing::instrument(skip(self), target = TRACING_TARGET_RAG)]
    pub async fn push(&self, project_id: i32, reset: bool) -> Result<PushSummary> {
        let dimensions = self.embedder.dimensions();
        let collection = self.collection_name(project_id)?;
        let collection_created = self.store.create(&collection, dimensions, reset).await?;

        let mut summary = PushSummary {
            collection,
            collection_created,
            rows_inserted: 0,
            pages: 0,
            index_created: false,
            usage: UsageRecord::default(),
        };

        let mut page = OffsetPagination::new(self.page_size, 0);
        loop {
            let chunks = {
                let mut conn = self.pg.get_connection().await?;
                conn.list_project_chunks(project_id, page).await?
            };
            if chunks.is_empty() {
                break;
            }

            let full_page = chunks.len() as i64 >= page.limit;
            let texts: Vec<String> = chunks.iter().map(|c| c.chunk_text.clone()).collect();
            let Embeddings { vectors, usage } =
                self.embedder.embed(&texts, EmbeddingMode::Document).await?;

            let items = to_vector_items(chunks, vectors)?;
            let inserted = self.store.insert(&summary.collection, &items).await?;

            summary.rows_inserted += inserted.rows_inserted;
            summary.index_created |= inserted.index_created;
            summary.pages += 1;
            summary.usage = summary.usage.combine(&usage);

            tracing::debug!(
                target: TRACING_TARGET_RAG,
                page = page.page_number(),
                rows = inserted.rows_inserted,
                "Indexed page"
            );

            if !full_page {
                break;
            }
            page = page.next_page();
        }

        tracing::info!(
            target: TRACING_TARGET_RAG,
            collection = %summary.collection,
            rows = summary.rows_inserted,
            cost = %summary.usage.cost,
            "Pushed chunks into collection"
        );

        Ok(summary)
    }
}

/// Maps split chunks onto rows of the `chunks` table.
fn to_new_chunks(project_id: i32, asset_name: &str, chunks: Vec<Chunk>) -> Vec<NewChunk> {
    chunks
        .into_iter()
        .map(|chunk| NewChunk {
            chunk_text: sanitize_text(&chunk.text),
            chunk_metadata: Value::Object(chunk.metadata),
            chunk_order: chunk.ordinal as i32,
            chunk_project_id: project_id,
            chunk_asset_name: asset_name.to_owned(),
        })
        .collect()
}

/// Pairs persisted chunks with their vectors.
fn to_vector_items(chunks: Vec<StoredChunk>, vectors: Vec<Vec<f32>>) -> Result<Vec<VectorItem>> {
    if vectors.len() != chunks.len() {
        return Err(Error::embedding(format!(
            "received {} vectors for {} chunks",
            vectors.len(),
            chunks.len()
        )));
    }

    let (texts, (metadata, chunk_ids)): (Vec<_>, (Vec<_>, Vec<_>)) = chunks
        .into_iter()
        .map(|c| (c.chunk_text, (c.chunk_metadata, c.chunk_id)))
        .unzip();

    Ok(VectorItem::from_columns(texts, vectors, metadata, chunk_ids)?)
}
