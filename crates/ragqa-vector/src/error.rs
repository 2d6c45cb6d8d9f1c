//! Vector store error types.

use ragqa_postgres::PgError;
use thiserror::Error;

/// Result type for vector store operations.
pub type VectorResult<T, E = VectorError> = Result<T, E>;

/// Vector store errors.
#[derive(Debug, Error)]
#[must_use = "vector store errors should be handled appropriately"]
pub enum VectorError {
    /// Invalid settings, identifiers, or inconsistent inputs.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// The named collection does not exist.
    #[error("collection not found: {0}")]
    CollectionNotFound(String),

    /// A vector's width differs from the collection's fixed width.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// One batch of a multi-batch insert failed.
    ///
    /// Batches before `batch_index` stay committed; later batches were not started.
    #[error(
        "insert batch {batch_index} failed after {committed_batches} committed batches \
         ({committed_rows} rows): {source}"
    )]
    PartialBatchFailure {
        /// Zero-based index of the failed batch.
        batch_index: usize,
        /// Number of batches committed before the failure.
        committed_batches: usize,
        /// Number of rows committed before the failure.
        committed_rows: usize,
        /// Why the batch failed.
        #[source]
        source: Box<VectorError>,
    },

    /// The underlying database rejected an operation.
    #[error(transparent)]
    Database(#[from] PgError),
}

impl VectorError {
    /// Creates a configuration error.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Creates a collection not found error.
    pub fn collection_not_found(name: impl Into<String>) -> Self {
        Self::CollectionNotFound(name.into())
    }

    /// Creates a dimension mismatch error.
    pub fn dimension_mismatch(expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch { expected, actual }
    }

    /// Returns whether the error reports a missing collection.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::CollectionNotFound(_))
    }
}

impl From<diesel::result::Error> for VectorError {
    fn from(err: diesel::result::Error) -> Self {
        Self::Database(PgError::from(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_batch_display() {
        let err = VectorError::PartialBatchFailure {
            batch_index: 2,
            committed_batches: 2,
            committed_rows: 100,
            source: Box::new(VectorError::dimension_mismatch(3, 4)),
        };

        let msg = err.to_string();
        assert!(msg.contains("batch 2"));
        assert!(msg.contains("100 rows"));
        assert!(msg.contains("expected 3, got 4"));
    }

    #[test]
    fn test_is_not_found() {
        assert!(VectorError::collection_not_found("c").is_not_found());
        assert!(!VectorError::configuration("bad").is_not_found());
    }
}
