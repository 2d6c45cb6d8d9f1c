//! Vector store trait and the engine built on top of it.

use async_trait::async_trait;
use ragqa_postgres::PgClient;

use crate::TRACING_TARGET;
use crate::collection::{COLLECTION_PREFIX, CollectionInfo, CollectionName};
use crate::config::{
    DistanceMetric, IndexCheckPolicy, IndexType, VectorBackendKind, VectorStoreConfig,
    validate_batch_size,
};
use crate::error::{VectorError, VectorResult};
use crate::memory::MemoryBackend;
use crate::pgvector::PgVectorBackend;
use crate::record::{IndexOutcome, InsertSummary, RetrievedDocument, VectorItem};

/// Storage primitives a collection backend provides.
///
/// Backends perform no threshold or batching logic of their own; that lives
/// in [`VectorStore`] so every backend behaves the same.
#[async_trait]
pub trait VectorStoreBackend: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Checks if a collection exists.
    async fn collection_exists(&self, name: &CollectionName) -> VectorResult<bool>;

    /// Creates a collection; returns `false` if it already existed.
    async fn create_collection(
        &self,
        name: &CollectionName,
        dimensions: usize,
        distance: DistanceMetric,
    ) -> VectorResult<bool>;

    /// Drops a collection; returns `false` if it did not exist.
    async fn drop_collection(&self, name: &CollectionName) -> VectorResult<bool>;

    /// Lists collection names, sorted.
    async fn list_collections(&self) -> VectorResult<Vec<CollectionName>>;

    /// Describes a collection, or `None` if it does not exist.
    async fn describe_collection(&self, name: &CollectionName)
    -> VectorResult<Option<CollectionInfo>>;

    /// Inserts rows as one atomic unit and returns how many were written.
    async fn insert_rows(&self, name: &CollectionName, rows: &[VectorItem]) -> VectorResult<usize>;

    /// Returns up to `limit` rows ranked by descending similarity to `query`.
    async fn search(
        &self,
        name: &CollectionName,
        query: &[f32],
        limit: usize,
        distance: DistanceMetric,
    ) -> VectorResult<Vec<RetrievedDocument>>;

    /// Builds the acceleration index; returns `false` if it already existed.
    async fn create_index(
        &self,
        name: &CollectionName,
        index_type: IndexType,
        distance: DistanceMetric,
    ) -> VectorResult<bool>;

    /// Drops the acceleration index; returns `false` if it did not exist.
    async fn drop_index(&self, name: &CollectionName) -> VectorResult<bool>;
}

/// Collection registry and vector store engine over one backend.
pub struct VectorStore {
    config: VectorStoreConfig,
    backend: Box<dyn VectorStoreBackend>,
}

impl VectorStore {
    /// Creates a vector store from configuration.
    ///
    /// The pgvector backend requires a database client.
    pub fn new(config: VectorStoreConfig, pg: Option<&PgClient>) -> VectorResult<Self> {
        config.validate()?;

        let backend: Box<dyn VectorStoreBackend> = match config.backend {
            VectorBackendKind::PgVector => {
                let pg = pg.ok_or_else(|| {
                    VectorError::configuration("the pgvector backend requires a database client")
                })?;
                Box::new(PgVectorBackend::new(pg.clone()))
            }
            VectorBackendKind::Memory => Box::new(MemoryBackend::new()),
        };

        Ok(Self::from_backend(config, backend))
    }

    /// Creates a vector store over an already constructed backend.
    pub fn from_backend(config: VectorStoreConfig, backend: Box<dyn VectorStoreBackend>) -> Self {
        tracing::info!(
            target: TRACING_TARGET,
            backend = backend.name(),
            index_threshold = config.index_threshold,
            index_check = %config.index_check,
            "Vector store initialized"
        );

        Self { config, backend }
    }

    /// Returns the configuration.
    #[inline]
    pub fn config(&self) -> &VectorStoreConfig {
        &self.config
    }

    /// Returns the deterministic collection name for a project.
    pub fn name_for(
        &self,
        project_id: impl std::fmt::Display,
        dimensions: usize,
    ) -> VectorResult<CollectionName> {
        CollectionName::for_project(project_id, dimensions)
    }

    /// Checks if a collection exists.
    pub async fn exists(&self, name: &CollectionName) -> VectorResult<bool> {
        self.backend.collection_exists(name).await
    }

    /// Creates a collection with the configured distance metric.
    ///
    /// With `reset`, any existing collection of that name is dropped first.
    /// Returns `false` when the collection already existed.
    pub async fn create(
        &self,
        name: &CollectionName,
        dimensions: usize,
        reset: bool,
    ) -> VectorResult<bool> {
        if dimensions == 0 {
            return Err(VectorError::configuration("vector dimensions must be positive"));
        }

        if reset {
            self.drop(name).await?;
        }

        let created = self
            .backend
            .create_collection(name, dimensions, self.config.distance)
            .await?;

        tracing::info!(
            target: TRACING_TARGET,
            collection = %name,
            dimensions,
            distance = %self.config.distance,
            created,
            "Collection ensured"
        );

        Ok(created)
    }

    /// Drops a collection; returns `false` if it did not exist.
    pub async fn drop(&self, name: &CollectionName) -> VectorResult<bool> {
        let dropped = self.backend.drop_collection(name).await?;
        tracing::info!(target: TRACING_TARGET, collection = %name, dropped, "Collection dropped");
        Ok(dropped)
    }

    /// Describes a collection, or `None` if it does not exist.
    pub async fn describe(&self, name: &CollectionName) -> VectorResult<Option<CollectionInfo>> {
        self.backend.describe_collection(name).await
    }

    /// Lists every collection name carrying the collection prefix.
    pub async fn list(&self) -> VectorResult<Vec<CollectionName>> {
        let mut names = self.backend.list_collections().await?;
        names.retain(|name| name.as_str().starts_with(COLLECTION_PREFIX));
        Ok(names)
    }

    /// Inserts items using the configured batch size.
    pub async fn insert(
        &self,
        name: &CollectionName,
        items: &[VectorItem],
    ) -> VectorResult<InsertSummary> {
        self.insert_batch(name, items, self.config.insert_batch_size).await
    }

    /// Inserts items in sequential batches, each committed atomically.
    ///
    /// Every item is validated before the first batch starts. If batch `k`
    /// fails, batches before it stay committed, later batches are not started,
    /// and a [`VectorError::PartialBatchFailure`] reports `k`.
    #[tracing::instrument(skip(self, items), target = TRACING_TARGET, fields(collection = %name, items = items.len()))]
    pub async fn insert_batch(
        &self,
        name: &CollectionName,
        items: &[VectorItem],
        batch_size: usize,
    ) -> VectorResult<InsertSummary> {
        validate_batch_size(batch_size)?;

        let info = self.require(name).await?;
        if let Some(item) = items.iter().find(|item| item.vector.len() != info.dimensions) {
            tracing::warn!(
                target: TRACING_TARGET,
                collection = %name,
                expected = info.dimensions,
                actual = item.vector.len(),
                "Rejecting insert with mismatched vector width"
            );
            return Err(VectorError::dimension_mismatch(info.dimensions, item.vector.len()));
        }

        let mut summary = InsertSummary::default();
        for (batch_index, batch) in items.chunks(batch_size).enumerate() {
            match self.backend.insert_rows(name, batch).await {
                Ok(rows) => {
                    summary.rows_inserted += rows;
                    summary.batches_committed += 1;
                }
                Err(source) => {
                    tracing::error!(
                        target: TRACING_TARGET,
                        collection = %name,
                        batch_index,
                        committed_rows = summary.rows_inserted,
                        error = %source,
                        "Insert batch failed"
                    );
                    return Err(VectorError::PartialBatchFailure {
                        batch_index,
                        committed_batches: summary.batches_committed,
                        committed_rows: summary.rows_inserted,
                        source: Box::new(source),
                    });
                }
            }

            if self.config.index_check == IndexCheckPolicy::PerBatch {
                summary.index_created |= self.check_index(name).await;
            }
        }

        if self.config.index_check == IndexCheckPolicy::PerCall && summary.batches_committed > 0 {
            summary.index_created |= self.check_index(name).await;
        }

        tracing::debug!(
            target: TRACING_TARGET,
            collection = %name,
            rows = summary.rows_inserted,
            batches = summary.batches_committed,
            "Insert completed"
        );

        Ok(summary)
    }

    /// Returns up to `limit` documents ranked by descending similarity.
    ///
    /// An empty collection yields an empty list.
    pub async fn search(
        &self,
        name: &CollectionName,
        query: &[f32],
        limit: usize,
    ) -> VectorResult<Vec<RetrievedDocument>> {
        let info = self.require(name).await?;
        if query.len() != info.dimensions {
            return Err(VectorError::dimension_mismatch(info.dimensions, query.len()));
        }

        if limit == 0 || info.row_count == 0 {
            return Ok(Vec::new());
        }

        let documents = self.backend.search(name, query, limit, info.distance).await?;
        tracing::debug!(
            target: TRACING_TARGET,
            collection = %name,
            limit,
            hits = documents.len(),
            "Search completed"
        );

        Ok(documents)
    }

    /// Builds the acceleration index if the collection has reached the threshold.
    pub async fn ensure_index(&self, name: &CollectionName) -> VectorResult<IndexOutcome> {
        let info = self.require(name).await?;

        if info.has_index {
            return Ok(IndexOutcome::AlreadyPresent);
        }

        if info.row_count < self.config.index_threshold {
            return Ok(IndexOutcome::BelowThreshold);
        }

        let created = self
            .backend
            .create_index(name, self.config.index_type, info.distance)
            .await?;

        if created {
            tracing::info!(
                target: TRACING_TARGET,
                collection = %name,
                index_type = %self.config.index_type,
                row_count = info.row_count,
                "Acceleration index created"
            );
            Ok(IndexOutcome::Created)
        } else {
            Ok(IndexOutcome::AlreadyPresent)
        }
    }

    /// Drops the acceleration index and re-runs the threshold-gated creation.
    pub async fn reset_index(&self, name: &CollectionName) -> VectorResult<IndexOutcome> {
        self.require(name).await?;
        let dropped = self.backend.drop_index(name).await?;
        tracing::info!(target: TRACING_TARGET, collection = %name, dropped, "Acceleration index dropped");
        self.ensure_index(name).await
    }

    /// Runs [`Self::ensure_index`], logging and swallowing failures.
    async fn check_index(&self, name: &CollectionName) -> bool {
        match self.ensure_index(name).await {
            Ok(outcome) => outcome == IndexOutcome::Created,
            Err(err) => {
                tracing::warn!(
                    target: TRACING_TARGET,
                    collection = %name,
                    error = %err,
                    "Index check failed"
                );
                false
            }
        }
    }

    async fn require(&self, name: &CollectionName) -> VectorResult<CollectionInfo> {
        self.backend
            .describe_collection(name)
            .await?
            .ok_or_else(|| VectorError::collection_not_found(name.as_str()))
    }
}

impl std::fmt::Debug for VectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorStore")
            .field("backend", &self.backend.name())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// Memory backend that fails a chosen insert call and counts index builds.
    #[derive(Default)]
    struct Instrumented {
        inner: MemoryBackend,
        fail_on_insert: Option<usize>,
        inserts: AtomicUsize,
        index_builds: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl VectorStoreBackend for Instrumented {
        fn name(&self) -> &'static str {
            "instrumented"
        }

        async fn collection_exists(&self, name: &CollectionName) -> VectorResult<bool> {
            self.inner.collection_exists(name).await
        }

        async fn create_collection(
            &self,
            name: &CollectionName,
            dimensions: usize,
            distance: DistanceMetric,
        ) -> VectorResult<bool> {
            self.inner.create_collection(name, dimensions, distance).await
        }

        async fn drop_collection(&self, name: &CollectionName) -> VectorResult<bool> {
            self.inner.drop_collection(name).await
        }

        async fn list_collections(&self) -> VectorResult<Vec<CollectionName>> {
            self.inner.list_collections().await
        }

        async fn describe_collection(
            &self,
            name: &CollectionName,
        ) -> VectorResult<Option<CollectionInfo>> {
            self.inner.describe_collection(name).await
        }

        async fn insert_rows(
            &self,
            name: &CollectionName,
            rows: &[VectorItem],
        ) -> VectorResult<usize> {
            let call = self.inserts.fetch_add(1, Ordering::SeqCst);
            if self.fail_on_insert == Some(call) {
                return Err(VectorError::configuration("injected failure"));
            }
            self.inner.insert_rows(name, rows).await
        }

        async fn search(
            &self,
            name: &CollectionName,
            query: &[f32],
            limit: usize,
            distance: DistanceMetric,
        ) -> VectorResult<Vec<RetrievedDocument>> {
            self.inner.search(name, query, limit, distance).await
        }

        async fn create_index(
            &self,
            name: &CollectionName,
            index_type: IndexType,
            distance: DistanceMetric,
        ) -> VectorResult<bool> {
            self.index_builds.fetch_add(1, Ordering::SeqCst);
            self.inner.create_index(name, index_type, distance).await
        }

        async fn drop_index(&self, name: &CollectionName) -> VectorResult<bool> {
            self.inner.drop_index(name).await
        }
    }

    fn items(n: usize, dims: usize) -> Vec<VectorItem> {
        (0..n)
            .map(|i| {
                let mut vector = vec![0.0; dims];
                vector[i % dims] = 1.0 + i as f32;
                VectorItem::new(format!("text {i}"), vector, i as i32 + 1)
            })
            .collect()
    }

    fn memory_store(config: VectorStoreConfig) -> VectorStore {
        VectorStore::from_backend(config, Box::new(MemoryBackend::new()))
    }

    fn name() -> CollectionName {
        CollectionName::for_project(7, 3).unwrap()
    }

    #[test]
    fn test_pgvector_requires_client() {
        let err = VectorStore::new(VectorStoreConfig::default(), None).unwrap_err();
        assert!(matches!(err, VectorError::Configuration(_)));

        let store = VectorStore::new(VectorStoreConfig::new(VectorBackendKind::Memory), None);
        assert!(store.is_ok());
    }

    #[tokio::test]
    async fn test_create_is_idempotent() {
        let store = memory_store(VectorStoreConfig::default());
        let name = name();

        assert!(!store.exists(&name).await.unwrap());
        assert!(store.create(&name, 3, false).await.unwrap());
        assert!(!store.create(&name, 3, false).await.unwrap());
        assert!(store.exists(&name).await.unwrap());

        store.insert(&name, &items(2, 3)).await.unwrap();
        assert!(store.create(&name, 3, true).await.unwrap());
        let info = store.describe(&name).await.unwrap().unwrap();
        assert_eq!(info.row_count, 0);
        assert_eq!(info.dimensions, 3);

        assert!(store.drop(&name).await.unwrap());
        assert!(!store.drop(&name).await.unwrap());
        assert!(store.describe(&name).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_name_for_rejects_mixed_case() {
        let store = memory_store(VectorStoreConfig::default());
        let err = store.name_for("ProjA", 3).unwrap_err();
        assert!(matches!(err, VectorError::Configuration(_)));

        let name = store.name_for("proja", 3).unwrap();
        assert!(store.create(&name, 3, false).await.unwrap());
        assert!(store.exists(&name).await.unwrap());
        assert_eq!(store.list().await.unwrap(), vec![name]);
    }

    #[tokio::test]
    async fn test_list_collections() {
        let store = memory_store(VectorStoreConfig::default());
        let b = CollectionName::for_project(2, 3).unwrap();
        let a = CollectionName::for_project(1, 3).unwrap();
        store.create(&b, 3, false).await.unwrap();
        store.create(&a, 3, false).await.unwrap();
        store.create(&CollectionName::new("scratch").unwrap(), 3, false).await.unwrap();

        assert_eq!(store.list().await.unwrap(), vec![a, b]);
    }

    #[tokio::test]
    async fn test_insert_then_search_ranks_all() {
        let store = memory_store(VectorStoreConfig::default());
        let name = name();
        store.create(&name, 3, false).await.unwrap();

        let summary = store.insert_batch(&name, &items(5, 3), 2).await.unwrap();
        assert_eq!(summary.rows_inserted, 5);
        assert_eq!(summary.batches_committed, 3);

        let hits = store.search(&name, &[1.0, 0.2, 0.1], 10).await.unwrap();
        assert_eq!(hits.len(), 5);
        assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[tokio::test]
    async fn test_search_missing_and_empty() {
        let store = memory_store(VectorStoreConfig::default());
        let name = name();

        let err = store.search(&name, &[1.0, 0.0, 0.0], 5).await.unwrap_err();
        assert!(err.is_not_found());

        store.create(&name, 3, false).await.unwrap();
        assert!(store.search(&name, &[1.0, 0.0, 0.0], 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_insert_rejects_before_writing() {
        let store = memory_store(VectorStoreConfig::default());
        let name = name();

        let err = store.insert(&name, &items(1, 3)).await.unwrap_err();
        assert!(err.is_not_found());

        store.create(&name, 3, false).await.unwrap();
        let mut batch = items(4, 3);
        batch[3].vector.push(0.0);

        let err = store.insert_batch(&name, &batch, 2).await.unwrap_err();
        assert!(matches!(err, VectorError::DimensionMismatch { expected: 3, actual: 4 }));
        assert_eq!(store.describe(&name).await.unwrap().unwrap().row_count, 0);

        let err = store.search(&name, &[1.0], 1).await.unwrap_err();
        assert!(matches!(err, VectorError::DimensionMismatch { .. }));
    }

    #[tokio::test]
    async fn test_partial_batch_failure() {
        let backend = Instrumented {
            fail_on_insert: Some(2),
            ..Instrumented::default()
        };
        let store = VectorStore::from_backend(VectorStoreConfig::default(), Box::new(backend));
        let name = name();
        store.create(&name, 3, false).await.unwrap();

        let err = store.insert_batch(&name, &items(10, 3), 2).await.unwrap_err();
        match err {
            VectorError::PartialBatchFailure {
                batch_index,
                committed_batches,
                committed_rows,
                ..
            } => {
                assert_eq!(batch_index, 2);
                assert_eq!(committed_batches, 2);
                assert_eq!(committed_rows, 4);
            }
            other => panic!("unexpected error: {other}"),
        }

        assert_eq!(store.describe(&name).await.unwrap().unwrap().row_count, 4);
    }

    #[tokio::test]
    async fn test_index_built_once_past_threshold() {
        let builds = Arc::new(AtomicUsize::new(0));
        let backend = Instrumented {
            index_builds: builds.clone(),
            ..Instrumented::default()
        };
        let store = VectorStore::from_backend(
            VectorStoreConfig::default().with_index_threshold(100),
            Box::new(backend),
        );
        let name = name();
        store.create(&name, 3, false).await.unwrap();

        let all = items(120, 3);
        let summary = store.insert_batch(&name, &all[..90], 50).await.unwrap();
        assert!(!summary.index_created);
        assert!(!store.describe(&name).await.unwrap().unwrap().has_index);

        let summary = store.insert_batch(&name, &all[90..110], 50).await.unwrap();
        assert!(summary.index_created);
        assert!(store.describe(&name).await.unwrap().unwrap().has_index);

        let summary = store.insert_batch(&name, &all[110..], 5).await.unwrap();
        assert!(!summary.index_created);
        assert_eq!(store.ensure_index(&name).await.unwrap(), IndexOutcome::AlreadyPresent);
        assert_eq!(builds.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_index_check_policies() {
        let builds = Arc::new(AtomicUsize::new(0));
        let backend = Instrumented {
            index_builds: builds.clone(),
            ..Instrumented::default()
        };
        let store = VectorStore::from_backend(
            VectorStoreConfig::default()
                .with_index_threshold(4)
                .with_index_check(IndexCheckPolicy::Disabled),
            Box::new(backend),
        );
        let name = name();
        store.create(&name, 3, false).await.unwrap();

        let summary = store.insert_batch(&name, &items(6, 3), 2).await.unwrap();
        assert!(!summary.index_created);
        assert_eq!(builds.load(Ordering::SeqCst), 0);

        assert_eq!(store.ensure_index(&name).await.unwrap(), IndexOutcome::Created);
        assert_eq!(store.reset_index(&name).await.unwrap(), IndexOutcome::Created);
        assert_eq!(builds.load(Ordering::SeqCst), 2);

        let per_call = memory_store(
            VectorStoreConfig::default()
                .with_index_threshold(4)
                .with_index_check(IndexCheckPolicy::PerCall),
        );
        per_call.create(&name, 3, false).await.unwrap();
        let summary = per_call.insert_batch(&name, &items(6, 3), 1).await.unwrap();
        assert!(summary.index_created);
        assert_eq!(summary.batches_committed, 6);
    }

    #[tokio::test]
    async fn test_below_threshold() {
        let store = memory_store(VectorStoreConfig::default().with_index_threshold(10));
        let name = name();
        store.create(&name, 3, false).await.unwrap();
        store.insert(&name, &items(3, 3)).await.unwrap();

        assert_eq!(store.ensure_index(&name).await.unwrap(), IndexOutcome::BelowThreshold);
        assert_eq!(store.reset_index(&name).await.unwrap(), IndexOutcome::BelowThreshold);
    }
}
