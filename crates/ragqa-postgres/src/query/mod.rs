//! Repository traits implemented for [`PgConnection`].
//!
//! [`PgConnection`]: crate::PgConnection

mod chunk;

pub use chunk::{CHUNK_INSERT_BATCH_SIZE, ChunkRepository};
