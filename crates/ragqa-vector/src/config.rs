//! Vector store configuration types.

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::error::{VectorError, VectorResult};

/// Bind parameters per inserted row.
const PARAMS_PER_ROW: usize = 4;

/// PostgreSQL's limit on bind parameters in a single statement.
const MAX_BIND_PARAMS: usize = u16::MAX as usize;

/// Backend holding the collections, chosen once at start-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(AsRefStr, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum VectorBackendKind {
    /// PostgreSQL tables with a pgvector column.
    #[default]
    #[strum(serialize = "pgvector")]
    #[serde(rename = "pgvector")]
    PgVector,
    /// Process-local storage, lost on exit.
    Memory,
}

/// Similarity measure, fixed per collection when it is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(AsRefStr, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum DistanceMetric {
    /// Cosine similarity, `1 - cosine distance`.
    #[default]
    Cosine,
    /// Inner product.
    Dot,
}

impl DistanceMetric {
    /// Returns the pgvector distance operator.
    pub fn operator(self) -> &'static str {
        match self {
            Self::Cosine => "<=>",
            Self::Dot => "<#>",
        }
    }

    /// Returns the pgvector operator class used by indexes.
    pub fn ops_class(self) -> &'static str {
        match self {
            Self::Cosine => "vector_cosine_ops",
            Self::Dot => "vector_ip_ops",
        }
    }

    /// Scores two vectors, higher meaning more similar.
    pub fn score(self, a: &[f32], b: &[f32]) -> f64 {
        let dot: f64 = a.iter().zip(b).map(|(x, y)| *x as f64 * *y as f64).sum();
        match self {
            Self::Dot => dot,
            Self::Cosine => {
                let norm = |v: &[f32]| v.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
                let denom = norm(a) * norm(b);
                if denom == 0.0 { 0.0 } else { dot / denom }
            }
        }
    }
}

/// Acceleration index built once a collection is large enough.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(AsRefStr, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum IndexType {
    /// Hierarchical navigable small world graph.
    #[default]
    Hnsw,
    /// Inverted file with flat lists.
    IvfFlat,
}

/// When [`VectorStore::insert_batch`] checks whether to build the index.
///
/// [`VectorStore::insert_batch`]: crate::VectorStore::insert_batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(AsRefStr, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum IndexCheckPolicy {
    /// After every committed batch.
    #[default]
    PerBatch,
    /// Once, after all batches of a call committed.
    PerCall,
    /// Never; use [`VectorStore::ensure_index`] explicitly.
    ///
    /// [`VectorStore::ensure_index`]: crate::VectorStore::ensure_index
    Disabled,
}

/// Vector store settings shared by every backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct VectorStoreConfig {
    /// Backend holding the collections (pgvector or memory)
    #[cfg_attr(
        feature = "config",
        arg(long = "vector-db-backend", env = "VECTOR_DB_BACKEND", default_value = "pgvector")
    )]
    pub backend: VectorBackendKind,

    /// Distance metric for new collections (cosine or dot)
    #[cfg_attr(
        feature = "config",
        arg(
            long = "vector-db-distance-method",
            env = "VECTOR_DB_DISTANCE_METHOD",
            default_value = "cosine"
        )
    )]
    pub distance: DistanceMetric,

    /// Row count at which the acceleration index is built
    #[cfg_attr(
        feature = "config",
        arg(
            long = "vector-db-index-threshold",
            env = "VECTOR_DB_PGVEC_INDEX_THRESHOLD",
            default_value = "100"
        )
    )]
    pub index_threshold: u64,

    /// Acceleration index type (hnsw or ivf_flat)
    #[cfg_attr(
        feature = "config",
        arg(
            long = "vector-db-index-type",
            env = "VECTOR_DB_PGVEC_INDEX_TYPE",
            default_value = "hnsw"
        )
    )]
    pub index_type: IndexType,

    /// When inserts check the index threshold (per_batch, per_call or disabled)
    #[cfg_attr(
        feature = "config",
        arg(
            long = "vector-db-index-check",
            env = "VECTOR_DB_INDEX_CHECK",
            default_value = "per_batch"
        )
    )]
    pub index_check: IndexCheckPolicy,

    /// Rows committed per insert transaction
    #[cfg_attr(
        feature = "config",
        arg(
            long = "vector-db-insert-batch-size",
            env = "VECTOR_DB_INSERT_BATCH_SIZE",
            default_value = "50"
        )
    )]
    pub insert_batch_size: usize,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            backend: VectorBackendKind::default(),
            distance: DistanceMetric::default(),
            index_threshold: 100,
            index_type: IndexType::default(),
            index_check: IndexCheckPolicy::default(),
            insert_batch_size: 50,
        }
    }
}

impl VectorStoreConfig {
    /// Creates a configuration for the given backend with default settings.
    pub fn new(backend: VectorBackendKind) -> Self {
        Self {
            backend,
            ..Self::default()
        }
    }

    /// Sets the distance metric for new collections.
    pub fn with_distance(mut self, distance: DistanceMetric) -> Self {
        self.distance = distance;
        self
    }

    /// Sets the index threshold.
    pub fn with_index_threshold(mut self, threshold: u64) -> Self {
        self.index_threshold = threshold;
        self
    }

    /// Sets the index type.
    pub fn with_index_type(mut self, index_type: IndexType) -> Self {
        self.index_type = index_type;
        self
    }

    /// Sets the index check policy.
    pub fn with_index_check(mut self, policy: IndexCheckPolicy) -> Self {
        self.index_check = policy;
        self
    }

    /// Sets the insert batch size.
    pub fn with_insert_batch_size(mut self, batch_size: usize) -> Self {
        self.insert_batch_size = batch_size;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> VectorResult<()> {
        validate_batch_size(self.insert_batch_size)
    }
}

/// Rejects batch sizes that are empty or exceed the statement parameter limit.
pub(crate) fn validate_batch_size(batch_size: usize) -> VectorResult<()> {
    if batch_size == 0 {
        return Err(VectorError::configuration("insert batch size must be at least 1"));
    }

    if batch_size * PARAMS_PER_ROW > MAX_BIND_PARAMS {
        return Err(VectorError::configuration(format!(
            "insert batch size must be at most {}",
            MAX_BIND_PARAMS / PARAMS_PER_ROW
        )));
    }

    Ok(())
}
