//! In-memory backend implementation.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::TRACING_TARGET;
use crate::collection::{CollectionInfo, CollectionName};
use crate::config::{DistanceMetric, IndexType};
use crate::error::{VectorError, VectorResult};
use crate::record::{RetrievedDocument, VectorItem};
use crate::store::VectorStoreBackend;

/// Owner reported for in-memory collections.
const OWNER: &str = "ragqa";

struct StoredRow {
    id: i64,
    text: String,
    vector: Vec<f32>,
    metadata: Value,
}

struct Collection {
    dimensions: usize,
    distance: DistanceMetric,
    index: Option<IndexType>,
    next_id: i64,
    rows: Vec<StoredRow>,
}

/// Backend keeping every collection in process memory.
///
/// Suited to tests and local experiments; contents are lost on drop.
#[derive(Default)]
pub struct MemoryBackend {
    collections: RwLock<BTreeMap<CollectionName, Collection>>,
}

impl MemoryBackend {
    /// Creates an empty backend.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorStoreBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn collection_exists(&self, name: &CollectionName) -> VectorResult<bool> {
        Ok(self.collections.read().await.contains_key(name))
    }

    async fn create_collection(
        &self,
        name: &CollectionName,
        dimensions: usize,
        distance: DistanceMetric,
    ) -> VectorResult<bool> {
        let mut collections = self.collections.write().await;
        if collections.contains_key(name) {
            return Ok(false);
        }

        collections.insert(
            name.clone(),
            Collection {
                dimensions,
                distance,
                index: None,
                next_id: 1,
                rows: Vec::new(),
            },
        );

        tracing::debug!(target: TRACING_TARGET, collection = %name, dimensions, "Memory collection created");
        Ok(true)
    }

    async fn drop_collection(&self, name: &CollectionName) -> VectorResult<bool> {
        Ok(self.collections.write().await.remove(name).is_some())
    }

    async fn list_collections(&self) -> VectorResult<Vec<CollectionName>> {
        Ok(self.collections.read().await.keys().cloned().collect())
    }

    async fn describe_collection(
        &self,
        name: &CollectionName,
    ) -> VectorResult<Option<CollectionInfo>> {
        let collections = self.collections.read().await;
        Ok(collections.get(name).map(|c| CollectionInfo {
            name: name.clone(),
            owner: OWNER.to_string(),
            has_index: c.index.is_some(),
            row_count: c.rows.len() as u64,
            dimensions: c.dimensions,
            distance: c.distance,
        }))
    }

    async fn insert_rows(&self, name: &CollectionName, rows: &[VectorItem]) -> VectorResult<usize> {
        let mut collections = self.collections.write().await;
        let collection = collections
            .get_mut(name)
            .ok_or_else(|| VectorError::collection_not_found(name.as_str()))?;

        if let Some(row) = rows.iter().find(|r| r.vector.len() != collection.dimensions) {
            return Err(VectorError::dimension_mismatch(
                collection.dimensions,
                row.vector.len(),
            ));
        }

        for row in rows {
            let id = collection.next_id;
            collection.next_id += 1;
            collection.rows.push(StoredRow {
                id,
                text: row.text.clone(),
                vector: row.vector.clone(),
                metadata: row.metadata.clone(),
            });
        }

        Ok(rows.len())
    }

    async fn search(
        &self,
        name: &CollectionName,
        query: &[f32],
        limit: usize,
        distance: DistanceMetric,
    ) -> VectorResult<Vec<RetrievedDocument>> {
        let collections = self.collections.read().await;
        let collection = collections
            .get(name)
            .ok_or_else(|| VectorError::collection_not_found(name.as_str()))?;

        let mut scored: Vec<(f64, &StoredRow)> = collection
            .rows
            .iter()
            .map(|row| (distance.score(&row.vector, query), row))
            .collect();
        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(Ordering::Equal)
                .then(a.1.id.cmp(&b.1.id))
        });

        Ok(scored
            .into_iter()
            .take(limit)
            .map(|(score, row)| {
                RetrievedDocument::from_row(row.id, row.text.clone(), &row.metadata, score)
            })
            .collect())
    }

    async fn create_index(
        &self,
        name: &CollectionName,
        index_type: IndexType,
        _distance: DistanceMetric,
    ) -> VectorResult<bool> {
        let mut collections = self.collections.write().await;
        let collection = collections
            .get_mut(name)
            .ok_or_else(|| VectorError::collection_not_found(name.as_str()))?;

        if collection.index.is_some() {
            return Ok(false);
        }
        collection.index = Some(index_type);
        Ok(true)
    }

    async fn drop_index(&self, name: &CollectionName) -> VectorResult<bool> {
        let mut collections = self.collections.write().await;
        Ok(collections
            .get_mut(name)
            .and_then(|c| c.index.take())
            .is_some())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn test_insert_is_all_or_nothing() {
        let backend = MemoryBackend::new();
        let name = CollectionName::for_project(1, 2).unwrap();
        backend
            .create_collection(&name, 2, DistanceMetric::Cosine)
            .await
            .unwrap();

        let rows = vec![
            VectorItem::new("ok", vec![1.0, 0.0], 1),
            VectorItem::new("bad", vec![1.0], 2),
        ];
        assert!(backend.insert_rows(&name, &rows).await.is_err());

        let info = backend.describe_collection(&name).await.unwrap().unwrap();
        assert_eq!(info.row_count, 0);
    }

    #[tokio::test]
    async fn test_search_dot_and_source_name() {
        let backend = MemoryBackend::new();
        let name = CollectionName::for_project(1, 2).unwrap();
        backend
            .create_collection(&name, 2, DistanceMetric::Dot)
            .await
            .unwrap();

        let rows = vec![
            VectorItem::new("small", vec![1.0, 0.0], 1),
            VectorItem::new("large", vec![3.0, 0.0], 2)
                .with_metadata(json!({"source": "/tmp/guide.md"})),
        ];
        backend.insert_rows(&name, &rows).await.unwrap();

        let hits = backend
            .search(&name, &[1.0, 0.0], 1, DistanceMetric::Dot)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].text, "large");
        assert_eq!(hits[0].id, "2");
        assert_eq!(hits[0].source_name, "guide.md");
        assert!((hits[0].score - 3.0).abs() < 1e-9);
    }
}
