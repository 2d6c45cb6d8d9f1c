//! Schema, document and collection management.

use std::path::Path;

use anyhow::Context as _;
use ragqa_postgres::run_pending_migrations;
use serde_json::{Map, Value, json};

use super::{Context, print_json};
use crate::TRACING_TARGET_COMMAND;

pub async fn migrate(context: &Context) -> anyhow::Result<()> {
    let result = run_pending_migrations(context.pg())
        .await
        .context("failed to apply migrations")?;

    tracing::info!(
        target: TRACING_TARGET_COMMAND,
        applied = result.applied_versions.len(),
        "Schema is up to date"
    );
    print_json(&result)
}

pub async fn process(
    context: &Context,
    project_id: i32,
    file: &Path,
    reset: bool,
) -> anyhow::Result<()> {
    let text = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;

    let asset_name = file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.display().to_string());

    let mut metadata = Map::new();
    metadata.insert("source".to_owned(), Value::String(file.display().to_string()));

    let summary = context
        .indexer()?
        .process(project_id, &asset_name, &text, metadata, reset)
        .await
        .context("failed to process document")?;

    print_json(&summary)
}

pub async fn push(
    context: &Context,
    project_id: i32,
    reset: bool,
    page_size: i64,
) -> anyhow::Result<()> {
    let summary = context
        .indexer()?
        .with_page_size(page_size)
        .push(project_id, reset)
        .await
        .context("failed to push chunks")?;

    print_json(&summary)
}

pub async fn info(context: &Context, project_id: i32) -> anyhow::Result<()> {
    let name = context.collection_name(project_id)?;
    let info = context
        .store()
        .describe(&name)
        .await
        .context("failed to describe collection")?;

    if info.is_none() {
        tracing::warn!(target: TRACING_TARGET_COMMAND, collection = %name, "Collection does not exist");
    }
    print_json(&info)
}

pub async fn reset(context: &Context, project_id: i32) -> anyhow::Result<()> {
    let name = context.collection_name(project_id)?;
    let dropped = context
        .store()
        .drop(&name)
        .await
        .context("failed to drop collection")?;

    print_json(&json!({ "collection": name, "dropped": dropped }))
}
