#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod error;
pub mod provider;
pub mod rag;
pub mod splitter;

pub use error::{Error, Result};

/// Tracing target for model provider calls.
pub const TRACING_TARGET_PROVIDER: &str = "ragqa_rig::provider";

/// Tracing target for retrieval, generation and indexing.
pub const TRACING_TARGET_RAG: &str = "ragqa_rig::rag";

/// Tracing target for text splitting.
pub const TRACING_TARGET_SPLITTER: &str = "ragqa_rig::splitter";
