//! Chunk model for PostgreSQL database operations.

use diesel::prelude::*;
use jiff_diesel::Timestamp;
use serde_json::Value;
use uuid::Uuid;

use crate::schema::chunks;

/// A persisted piece of a processed asset.
///
/// Chunks are the unit the indexer embeds; each vector row in a collection
/// references the chunk it was produced from.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = chunks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Chunk {
    /// Surrogate key referenced by collection rows.
    pub chunk_id: i32,
    /// Stable external identifier.
    pub chunk_uuid: Uuid,
    /// Chunk text.
    pub chunk_text: String,
    /// Arbitrary metadata carried from the splitter.
    pub chunk_metadata: Value,
    /// Position of the chunk within its asset, starting at 1.
    pub chunk_order: i32,
    /// Owning project.
    pub chunk_project_id: i32,
    /// Name of the asset the chunk came from.
    pub chunk_asset_name: String,
    /// Timestamp when the chunk was created.
    pub created_at: Timestamp,
    /// Timestamp when the chunk was last updated.
    pub updated_at: Timestamp,
}

impl Chunk {
    /// Returns the `source` metadata entry, if present.
    pub fn source(&self) -> Option<&str> {
        self.chunk_metadata.get("source").and_then(Value::as_str)
    }

    /// Returns the creation time.
    pub fn created_at(&self) -> jiff::Timestamp {
        self.created_at.into()
    }
}

/// Data for creating a new chunk.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = chunks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewChunk {
    /// Chunk text.
    pub chunk_text: String,
    /// Metadata.
    pub chunk_metadata: Value,
    /// Position within the asset, starting at 1.
    pub chunk_order: i32,
    /// Owning project.
    pub chunk_project_id: i32,
    /// Source asset name.
    pub chunk_asset_name: String,
}
