//! Retrieval-augmented generation over per-project vector collections.
//!
//! [`Indexer`] turns documents into persisted chunks and pushes them into a
//! collection, [`Retriever`] ranks a collection's documents for a query, and
//! [`Generator`] answers the query from the ranked context.

pub mod eval;
mod generator;
mod indexer;
mod retriever;
mod template;

#[cfg(test)]
mod mock;

pub use eval::{EvalItem, QueryMetrics, RetrievalReport, evaluate_retrieval, parse_eval_items};
pub use generator::{Answer, Generator, Prompt, TextNormalizer};
pub use indexer::{DEFAULT_PAGE_SIZE, Indexer, ProcessSummary, PushSummary};
pub use retriever::{Retrieval, Retriever};
pub use template::{
    DOCUMENT_PROMPT, FOOTER_PROMPT, RAG_NAMESPACE, SYSTEM_PROMPT, TemplateConfig,
    TemplateRegistry,
};
