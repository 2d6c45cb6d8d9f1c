//! Query-time retrieval.

use std::sync::Arc;

use ragqa_core::{EmbeddingMode, EmbeddingService, UsageRecord};
use ragqa_vector::{CollectionName, RetrievedDocument, VectorStore};
use serde::{Deserialize, Serialize};

use crate::{Result, TRACING_TARGET_RAG};

/// Documents ranked for a query, with the cost of embedding the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Retrieval {
    /// Hits ordered by descending score.
    pub documents: Vec<RetrievedDocument>,
    /// Accounting for the query embedding.
    pub usage: UsageRecord,
}

/// Turns a query into ranked context from a project's collection.
#[derive(Clone)]
pub struct Retriever {
    store: Arc<VectorStore>,
    embedder: Arc<dyn EmbeddingService>,
}

impl Retriever {
    /// Creates a retriever over a vector store and an embedding capability.
    pub fn new(store: Arc<VectorStore>, embedder: Arc<dyn EmbeddingService>) -> Self {
        Self { store, embedder }
    }

    /// Returns the vector store.
    pub fn store(&self) -> &VectorStore {
        &self.store
    }

    /// Returns the collection backing a project at the embedder's width.
    pub fn collection_name(&self, project_id: i32) -> Result<CollectionName> {
        Ok(self.store.name_for(project_id, self.embedder.dimensions())?)
    }

    /// Embeds `query` in query mode and searches the project's collection.
    ///
    /// Returns `None` when the embedding yields no vector or the search has
    /// no hits. A missing collection is an error.
    #[tracing::instrument(skip(self, query), target = TRACING_TARGET_RAG)]
    pub async fn retrieve(
        &self,
        project_id: i32,
        query: &str,
        limit: usize,
    ) -> Result<Option<Retrieval>> {
        let name = self.collection_name(project_id)?;
        let embeddings = self
            .embedder
            .embed(&[query.to_owned()], EmbeddingMode::Query)
            .await?;

        let Some(vector) = embeddings.first() else {
            tracing::debug!(target: TRACING_TARGET_RAG, "Query embedding produced no vector");
            return Ok(None);
        };

        let documents = self.store.search(&name, vector, limit).await?;
        if documents.is_empty() {
            tracing::debug!(target: TRACING_TARGET_RAG, collection = %name, "No documents matched");
            return Ok(None);
        }

        tracing::debug!(
            target: TRACING_TARGET_RAG,
            collection = %name,
            hits = documents.len(),
            top_score = documents[0].score,
            "Retrieved documents"
        );

        Ok(Some(Retrieval {
            documents,
            usage: embeddings.usage,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::rag::mock::{EmptyEmbedder, KeywordEmbedder, seeded_store};

    #[tokio::test]
    async fn test_retrieve_ranks_by_similarity() {
        let embedder = Arc::new(KeywordEmbedder);
        let store = seeded_store(7, &embedder).await;
        let retriever = Retriever::new(store, embedder);

        let retrieval = retriever.retrieve(7, "apple", 2).await.unwrap().unwrap();
        assert_eq!(retrieval.documents.len(), 2);
        assert!(retrieval.documents[0].text.contains("apple"));
        assert!(retrieval.documents[0].score >= retrieval.documents[1].score);
        assert_eq!(retrieval.documents[0].source_name, "fruit.txt");
        assert_eq!(retrieval.usage.prompt_tokens, 1);
    }

    #[tokio::test]
    async fn test_no_vector_is_empty_result() {
        let keyword = Arc::new(KeywordEmbedder);
        let store = seeded_store(8, &keyword).await;
        let retriever = Retriever::new(store, Arc::new(EmptyEmbedder));

        assert!(retriever.retrieve(8, "apple", 3).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_empty_collection_is_empty_result() {
        let embedder = Arc::new(KeywordEmbedder);
        let store = seeded_store(9, &embedder).await;
        let name = store.name_for(9, embedder.dimensions()).unwrap();
        store.create(&name, embedder.dimensions(), true).await.unwrap();
        let retriever = Retriever::new(store, embedder);

        assert!(retriever.retrieve(9, "apple", 3).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_collection_is_error() {
        let embedder = Arc::new(KeywordEmbedder);
        let store = seeded_store(10, &embedder).await;
        let retriever = Retriever::new(store, embedder);

        let err = retriever.retrieve(11, "apple", 3).await.unwrap_err();
        assert!(matches!(err, Error::Vector(e) if e.is_not_found()));
    }
}
