//! Retrieval-augmented answer generation.

use std::sync::Arc;

use ragqa_core::{ChatMessage, Cost, GenerationService, TemplateRenderer, UsageRecord};
use ragqa_vector::RetrievedDocument;
use serde::{Deserialize, Serialize};

use super::Retriever;
use super::template::{DOCUMENT_PROMPT, FOOTER_PROMPT, RAG_NAMESPACE, SYSTEM_PROMPT};
use crate::provider::process_text;
use crate::{Result, TRACING_TARGET_RAG};

/// Normalises each document's text before it is placed in the prompt.
pub type TextNormalizer = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// A prompt ready for the generation capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    /// Document blocks followed by the footer; sent as the user message.
    pub full_prompt: String,
    /// Messages preceding the user message.
    pub chat_history: Vec<ChatMessage>,
}

/// An answer with the prompt that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    /// Generated text.
    pub answer: String,
    /// Prompt sent as the user message.
    pub full_prompt: String,
    /// History sent before the prompt.
    pub chat_history: Vec<ChatMessage>,
    /// Tokens billed by the generation call.
    pub total_tokens: u64,
    /// Cost of the generation call.
    pub cost: Cost,
    /// Documents placed in the prompt.
    pub documents: Vec<RetrievedDocument>,
    /// Accounting for the query embedding.
    pub retrieval_usage: UsageRecord,
}

/// Answers queries from retrieved context.
///
/// Makes exactly one generation call per answer; retries are the generation
/// capability's concern.
#[derive(Clone)]
pub struct Generator {
    retriever: Retriever,
    generation: Arc<dyn GenerationService>,
    templates: Arc<dyn TemplateRenderer>,
    normalizer: TextNormalizer,
}

impl Generator {
    /// Creates a generator that truncates documents to `max_characters`.
    pub fn new(
        retriever: Retriever,
        generation: Arc<dyn GenerationService>,
        templates: Arc<dyn TemplateRenderer>,
        max_characters: usize,
    ) -> Self {
        Self {
            retriever,
            generation,
            templates,
            normalizer: Arc::new(move |text: &str| process_text(text, max_characters)),
        }
    }

    /// Replaces the document normaliser.
    pub fn with_normalizer(
        mut self,
        normalizer: impl Fn(&str) -> String + Send + Sync + 'static,
    ) -> Self {
        self.normalizer = Arc::new(normalizer);
        self
    }

    /// Returns the retriever.
    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// Renders the system message, one numbered block per document, and the
    /// footer carrying the query.
    pub fn build_prompt(&self, query: &str, documents: &[RetrievedDocument]) -> Result<Prompt> {
        let system_prompt = self.templates.render(RAG_NAMESPACE, SYSTEM_PROMPT, &[])?;

        let blocks = documents
            .iter()
            .enumerate()
            .map(|(i, doc)| {
                self.templates.render(
                    RAG_NAMESPACE,
                    DOCUMENT_PROMPT,
                    &[
                        ("doc_num", (i + 1).to_string()),
                        ("chunk_text", (self.normalizer)(&doc.text)),
                    ],
                )
            })
            .collect::<ragqa_core::Result<Vec<_>>>()?;

        let footer = self
            .templates
            .render(RAG_NAMESPACE, FOOTER_PROMPT, &[("query", query.to_owned())])?;

        Ok(Prompt {
            full_prompt: format!("{}\n\n{footer}", blocks.join("\n")),
            chat_history: vec![ChatMessage::system(system_prompt)],
        })
    }

    /// Retrieves context for `query` and generates an answer from it.
    ///
    /// Returns `None` when retrieval yields nothing; no generation call is
    /// made in that case.
    #[tracing::instrument(skip(self, query), target = TRACING_TARGET_RAG)]
    pub async fn answer(&self, project_id: i32, query: &str, limit: usize) -> Result<Option<Answer>> {
        let Some(retrieval) = self.retriever.retrieve(project_id, query, limit).await? else {
            return Ok(None);
        };

        let prompt = self.build_prompt(query, &retrieval.documents)?;
        let generation = self
            .generation
            .generate(&prompt.full_prompt, &prompt.chat_history)
            .await?;

        tracing::info!(
            target: TRACING_TARGET_RAG,
            documents = retrieval.documents.len(),
            total_tokens = generation.total_tokens,
            cost = %generation.cost,
            "Generated answer"
        );

        Ok(Some(Answer {
            answer: generation.text,
            full_prompt: prompt.full_prompt,
            chat_history: prompt.chat_history,
            total_tokens: generation.total_tokens,
            cost: generation.cost,
            documents: retrieval.documents,
            retrieval_usage: retrieval.usage,
        }))
    }
}
