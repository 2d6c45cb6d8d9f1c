//! Records flowing into and out of collections.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{VectorError, VectorResult};

/// A row to insert into a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorItem {
    /// Text the vector was computed from.
    pub text: String,
    /// Embedding vector.
    pub vector: Vec<f32>,
    /// Arbitrary metadata, stored as JSON.
    #[serde(default)]
    pub metadata: Value,
    /// Chunk the row was produced from.
    pub source_chunk_id: i32,
}

impl VectorItem {
    /// Creates an item with empty metadata.
    pub fn new(text: impl Into<String>, vector: Vec<f32>, source_chunk_id: i32) -> Self {
        Self {
            text: text.into(),
            vector,
            metadata: Value::Object(Default::default()),
            source_chunk_id,
        }
    }

    /// Sets the metadata.
    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }

    /// Zips parallel columns into items, rejecting columns of unequal length.
    pub fn from_columns(
        texts: Vec<String>,
        vectors: Vec<Vec<f32>>,
        metadata: Vec<Value>,
        chunk_ids: Vec<i32>,
    ) -> VectorResult<Vec<Self>> {
        let len = texts.len();
        for (column, actual) in [
            ("vectors", vectors.len()),
            ("metadata", metadata.len()),
            ("chunk_ids", chunk_ids.len()),
        ] {
            if actual != len {
                return Err(VectorError::configuration(format!(
                    "{column} has {actual} entries but texts has {len}"
                )));
            }
        }

        Ok(texts
            .into_iter()
            .zip(vectors)
            .zip(metadata)
            .zip(chunk_ids)
            .map(|(((text, vector), metadata), source_chunk_id)| Self {
                text,
                vector,
                metadata,
                source_chunk_id,
            })
            .collect())
    }
}

/// A search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedDocument {
    /// Store-assigned row identifier.
    pub id: String,
    /// File name of the document the text came from, or empty.
    pub source_name: String,
    /// Stored text.
    pub text: String,
    /// Similarity to the query, higher is closer.
    pub score: f64,
}

impl RetrievedDocument {
    /// Builds a hit, deriving the source name from the row's metadata.
    pub fn from_row(id: impl ToString, text: String, metadata: &Value, score: f64) -> Self {
        Self {
            id: id.to_string(),
            source_name: source_name(metadata),
            text,
            score,
        }
    }
}

/// Returns the file name from `metadata.source`, falling back to `metadata.file_path`.
pub fn source_name(metadata: &Value) -> String {
    ["source", "file_path"]
        .iter()
        .filter_map(|key| metadata.get(key).and_then(Value::as_str))
        .find(|path| !path.is_empty())
        .map(|path| {
            Path::new(path)
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.to_string())
        })
        .unwrap_or_default()
}

/// Outcome of a threshold-gated index check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexOutcome {
    /// The collection holds fewer rows than the threshold.
    BelowThreshold,
    /// The index already existed.
    AlreadyPresent,
    /// This call built the index.
    Created,
}

/// Summary of a successful [`VectorStore::insert_batch`] call.
///
/// [`VectorStore::insert_batch`]: crate::VectorStore::insert_batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertSummary {
    /// Rows written.
    pub rows_inserted: usize,
    /// Transactions committed.
    pub batches_committed: usize,
    /// Whether one of the index checks built the index.
    pub index_created: bool,
}
