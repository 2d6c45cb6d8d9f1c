//! Retrieval, answering and evaluation.

use std::path::Path;

use anyhow::Context as _;
use ragqa_rig::rag::{evaluate_retrieval, parse_eval_items};
use serde_json::json;

use super::{Context, print_json};
use crate::TRACING_TARGET_COMMAND;

pub async fn search(
    context: &Context,
    project_id: i32,
    text: &str,
    limit: usize,
) -> anyhow::Result<()> {
    let retrieval = context
        .retriever()?
        .retrieve(project_id, text, limit)
        .await
        .context("failed to retrieve documents")?;

    match retrieval {
        Some(retrieval) => print_json(&retrieval),
        None => {
            tracing::warn!(target: TRACING_TARGET_COMMAND, project_id, "No documents matched");
            print_json(&json!({ "documents": [], "usage": null }))
        }
    }
}

pub async fn answer(
    context: &Context,
    project_id: i32,
    text: &str,
    limit: usize,
) -> anyhow::Result<()> {
    let answer = context
        .generator()?
        .answer(project_id, text, limit)
        .await
        .context("failed to answer query")?;

    if answer.is_none() {
        tracing::warn!(target: TRACING_TARGET_COMMAND, project_id, "No documents to answer from");
    }
    print_json(&answer)
}

pub async fn eval(
    context: &Context,
    project_id: i32,
    file: &Path,
    k_values: &[usize],
) -> anyhow::Result<()> {
    let jsonl = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;
    let items = parse_eval_items(&jsonl).context("invalid evaluation file")?;
    let retriever = context.retriever()?;

    let report = evaluate_retrieval(&items, k_values, |query, limit| {
        let retriever = retriever.clone();
        async move {
            let ids: Vec<String> = retriever
                .retrieve(project_id, &query, limit)
                .await?
                .map(|retrieval| {
                    retrieval
                        .documents
                        .into_iter()
                        .map(|doc| doc.source_name)
                        .collect()
                })
                .unwrap_or_default();
            Ok::<_, ragqa_rig::Error>(ids)
        }
    })
    .await
    .context("failed to evaluate retrieval")?;

    tracing::info!(
        target: TRACING_TARGET_COMMAND,
        queries = report.per_query.len(),
        "Evaluated retrieval"
    );
    print_json(&report)
}
