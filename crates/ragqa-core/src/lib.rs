#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod error;
mod message;
mod service;
mod usage;

pub use error::{BoxedError, Error, ErrorKind, Result};
pub use message::{ChatMessage, Role};
pub use service::{
    EmbeddingMode, EmbeddingService, Embeddings, Generation, GenerationService, TemplateRenderer,
};
pub use usage::{Cost, UsageRecord};
