//! Deterministic capabilities for orchestrator tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ragqa_core::{
    ChatMessage, Cost, EmbeddingMode, EmbeddingService, Embeddings, Generation, GenerationService,
    UsageRecord,
};
use ragqa_vector::{VectorBackendKind, VectorItem, VectorStore, VectorStoreConfig};
use serde_json::json;

use crate::splitter::{TokenCounter, WordCounter};

pub(crate) const KEYWORDS: [&str; 4] = ["apple", "banana", "cherry", "date"];

pub(crate) const DOCUMENTS: [&str; 4] = [
    "apple pie with apple slices",
    "banana bread",
    "cherry and apple tart",
    "date palm",
];

/// One dimension per keyword, valued by how often the keyword occurs.
pub(crate) struct KeywordEmbedder;

#[async_trait]
impl EmbeddingService for KeywordEmbedder {
    fn dimensions(&self) -> usize {
        KEYWORDS.len()
    }

    async fn embed(&self, texts: &[String], _mode: EmbeddingMode) -> ragqa_core::Result<Embeddings> {
        let vectors = texts
            .iter()
            .map(|text| {
                KEYWORDS
                    .iter()
                    .map(|k| text.matches(k).count() as f32 + 0.01)
                    .collect()
            })
            .collect();

        let tokens: u64 = texts.iter().map(|t| WordCounter.count(t) as u64).sum();
        Ok(Embeddings {
            vectors,
            usage: UsageRecord::new(tokens, tokens, Cost::per_million(tokens, 0.02)),
        })
    }
}

/// Never produces a vector.
pub(crate) struct EmptyEmbedder;

#[async_trait]
impl EmbeddingService for EmptyEmbedder {
    fn dimensions(&self) -> usize {
        KEYWORDS.len()
    }

    async fn embed(&self, _texts: &[String], _mode: EmbeddingMode) -> ragqa_core::Result<Embeddings> {
        Ok(Embeddings::default())
    }
}

/// Records every request and answers with a fixed completion.
#[derive(Default)]
pub(crate) struct RecordingGenerator {
    pub calls: Mutex<Vec<(String, Vec<ChatMessage>)>>,
}

impl RecordingGenerator {
    pub fn calls(&self) -> Vec<(String, Vec<ChatMessage>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationService for RecordingGenerator {
    async fn generate(&self, prompt: &str, history: &[ChatMessage]) -> ragqa_core::Result<Generation> {
        self.calls
            .lock()
            .unwrap()
            .push((prompt.to_owned(), history.to_vec()));

        Ok(Generation {
            text: "It is an apple.".to_owned(),
            total_tokens: 42,
            cost: Cost::new(0.0005),
        })
    }
}

/// Returns an in-memory store whose project collection holds [`DOCUMENTS`].
pub(crate) async fn seeded_store(project_id: i32, embedder: &KeywordEmbedder) -> Arc<VectorStore> {
    let store = VectorStore::new(VectorStoreConfig::new(VectorBackendKind::Memory), None).unwrap();
    let name = store.name_for(project_id, embedder.dimensions()).unwrap();
    store.create(&name, embedder.dimensions(), false).await.unwrap();

    let texts: Vec<String> = DOCUMENTS.iter().map(ToString::to_string).collect();
    let embeddings = embedder.embed(&texts, EmbeddingMode::Document).await.unwrap();
    let items: Vec<VectorItem> = texts
        .into_iter()
        .zip(embeddings.vectors)
        .zip(1..)
        .map(|((text, vector), chunk_id)| {
            VectorItem::new(text, vector, chunk_id).with_metadata(json!({"source": "/data/fruit.txt"}))
        })
        .collect();
    store.insert(&name, &items).await.unwrap();

    Arc::new(store)
}
