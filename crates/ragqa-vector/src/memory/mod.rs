//! Process-local backend.

mod backend;

pub use backend::MemoryBackend;
