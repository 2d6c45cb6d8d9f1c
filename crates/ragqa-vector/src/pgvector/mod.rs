//! PostgreSQL pgvector backend.

mod backend;

pub use backend::PgVectorBackend;
