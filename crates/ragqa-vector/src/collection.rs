//! Collection naming and inspection.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::DistanceMetric;
use crate::error::{VectorError, VectorResult};

/// Prefix shared by every collection name.
pub const COLLECTION_PREFIX: &str = "collection_";

/// Suffix of the acceleration index name.
const INDEX_SUFFIX: &str = "_vector_idx";

/// Longest identifier PostgreSQL keeps without truncation.
const MAX_IDENTIFIER_LEN: usize = 63;

/// A validated collection name, safe to interpolate as an SQL identifier.
///
/// Only lowercase ASCII letters, digits and underscores are accepted, the
/// first character may not be a digit, and the name leaves room for the index
/// suffix within PostgreSQL's identifier limit. Unquoted identifiers are
/// folded to lowercase, so the stored table name always equals this string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CollectionName(String);

impl CollectionName {
    /// Validates an existing collection name.
    pub fn new(name: impl Into<String>) -> VectorResult<Self> {
        let name = name.into();

        if name.is_empty() {
            return Err(VectorError::configuration("collection name cannot be empty"));
        }

        if name.len() + INDEX_SUFFIX.len() > MAX_IDENTIFIER_LEN {
            return Err(VectorError::configuration(format!(
                "collection name '{name}' is longer than {} characters",
                MAX_IDENTIFIER_LEN - INDEX_SUFFIX.len()
            )));
        }

        if name.starts_with(|c: char| c.is_ascii_digit()) {
            return Err(VectorError::configuration(format!(
                "collection name '{name}' cannot start with a digit"
            )));
        }

        if !name.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_') {
            return Err(VectorError::configuration(format!(
                "collection name '{name}' may only contain lowercase letters, digits and underscores"
            )));
        }

        Ok(Self(name))
    }

    /// Returns the deterministic collection name for a project and vector width.
    pub fn for_project(project_id: impl fmt::Display, dimensions: usize) -> VectorResult<Self> {
        Self::new(format!("{COLLECTION_PREFIX}{dimensions}_{project_id}"))
    }

    /// Returns the name of this collection's acceleration index.
    pub fn index_name(&self) -> String {
        format!("{}{INDEX_SUFFIX}", self.0)
    }

    /// Returns the name as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CollectionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CollectionName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for CollectionName {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Self::new(name).map_err(serde::de::Error::custom)
    }
}

/// Snapshot of a collection's state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionInfo {
    /// Collection name.
    pub name: CollectionName,
    /// Role owning the underlying storage.
    pub owner: String,
    /// Whether the acceleration index exists.
    pub has_index: bool,
    /// Number of stored vectors.
    pub row_count: u64,
    /// Fixed vector width.
    pub dimensions: usize,
    /// Similarity measure fixed at creation.
    pub distance: DistanceMetric,
}
