//! Database row models.

mod chunk;

pub use chunk::{Chunk, NewChunk};
