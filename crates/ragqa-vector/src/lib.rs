#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

pub mod memory;
pub mod pgvector;

mod collection;
mod config;
mod error;
mod record;
mod store;

pub use collection::{COLLECTION_PREFIX, CollectionInfo, CollectionName};
pub use config::{DistanceMetric, IndexCheckPolicy, IndexType, VectorBackendKind, VectorStoreConfig};
pub use error::{VectorError, VectorResult};
pub use record::{IndexOutcome, InsertSummary, RetrievedDocument, VectorItem, source_name};
pub use store::{VectorStore, VectorStoreBackend};

/// Tracing target for vector store operations.
pub const TRACING_TARGET: &str = "ragqa_vector";
