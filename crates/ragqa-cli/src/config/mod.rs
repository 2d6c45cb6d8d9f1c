//! CLI configuration management.
//!
//! ```text
//! Cli
//! ├── postgres: PgConfig          # Connection string, pool sizing
//! ├── vector: VectorStoreConfig   # Backend, distance, index policy, batching
//! ├── provider: ProviderConfig    # Embedding/generation backends and models
//! ├── chunking: ChunkingConfig    # Chunk size and overlap
//! ├── templates: TemplateConfig   # Prompt languages
//! ├── log: LogConfig              # Log record format
//! └── command: Command            # Sub-command to run
//! ```
//!
//! Every option can be provided as a flag or an environment variable.

mod log;

use std::process;

use anyhow::Context;
use clap::Parser;
pub use log::{LogConfig, LogFormat};
use ragqa_postgres::PgConfig;
use ragqa_rig::provider::ProviderConfig;
use ragqa_rig::rag::TemplateConfig;
use ragqa_rig::splitter::ChunkingConfig;
use ragqa_vector::VectorStoreConfig;

use crate::command::Command;
use crate::{TRACING_TARGET_CONFIG, TRACING_TARGET_STARTUP};

/// Complete CLI configuration.
#[derive(Debug, Clone, Parser)]
#[command(name = "ragqa")]
#[command(about = "Index documents and answer questions with retrieval-augmented generation")]
#[command(version)]
pub struct Cli {
    /// Database connection and pool settings.
    #[clap(flatten)]
    pub postgres: PgConfig,

    /// Vector store settings.
    #[clap(flatten)]
    pub vector: VectorStoreConfig,

    /// Embedding and generation providers.
    #[clap(flatten)]
    pub provider: ProviderConfig,

    /// Chunk sizing.
    #[clap(flatten)]
    pub chunking: ChunkingConfig,

    /// Prompt template languages.
    #[clap(flatten)]
    pub templates: TemplateConfig,

    /// Log output.
    #[clap(flatten)]
    pub log: LogConfig,

    /// Sub-command to run.
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Loads environment variables from a .env file (if enabled) and parses
    /// CLI arguments.
    pub fn init() -> Self {
        Self::load_dotenv();
        Self::parse()
    }

    #[cfg(feature = "dotenv")]
    fn load_dotenv() {
        if let Err(err) = dotenvy::dotenv()
            && !err.not_found()
        {
            eprintln!("Warning: failed to load .env file: {err}");
        }
    }

    #[cfg(not(feature = "dotenv"))]
    fn load_dotenv() {}

    /// Validates all configuration values.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.postgres
            .validate()
            .context("invalid database configuration")?;
        self.vector
            .validate()
            .context("invalid vector store configuration")?;
        self.provider
            .validate()
            .context("invalid provider configuration")?;
        self.chunking
            .validate()
            .context("invalid chunking configuration")?;
        Ok(())
    }

    /// Logs configuration (no secrets).
    pub fn log(&self) {
        tracing::debug!(
            target: TRACING_TARGET_STARTUP,
            version = env!("CARGO_PKG_VERSION"),
            pid = process::id(),
            features = ?Self::enabled_features(),
            "Build information"
        );

        tracing::debug!(
            target: TRACING_TARGET_CONFIG,
            postgres_url = %self.postgres.database_url_masked(),
            postgres_max_connections = self.postgres.postgres_max_connections,
            "Database configuration"
        );

        tracing::debug!(
            target: TRACING_TARGET_CONFIG,
            backend = %self.vector.backend,
            distance = %self.vector.distance,
            index_threshold = self.vector.index_threshold,
            index_type = %self.vector.index_type,
            index_check = %self.vector.index_check,
            insert_batch_size = self.vector.insert_batch_size,
            "Vector store configuration"
        );

        tracing::debug!(
            target: TRACING_TARGET_CONFIG,
            generation_backend = %self.provider.generation_backend,
            generation_model = %self.provider.generation_model_id,
            embedding_backend = %self.provider.embedding_backend,
            embedding_model = %self.provider.embedding_model_id,
            embedding_dimensions = self.provider.embedding_model_size,
            chunk_size = self.chunking.chunk_size,
            chunk_overlap = self.chunking.chunk_overlap,
            "Provider configuration"
        );
    }

    fn enabled_features() -> Vec<&'static str> {
        [cfg!(feature = "dotenv").then_some("dotenv")]
            .into_iter()
            .flatten()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_push() {
        let cli = Cli::try_parse_from([
            "ragqa",
            "--chunk-size",
            "200",
            "--chunk-overlap",
            "40",
            "push",
            "3",
            "--reset",
        ])
        .unwrap();

        assert_eq!(cli.chunking.chunk_size, 200);
        assert_eq!(cli.chunking.chunk_overlap, 40);
        assert!(matches!(
            cli.command,
            Command::Push {
                project_id: 3,
                reset: true,
                ..
            }
        ));
    }

    #[test]
    fn test_parse_eval_cut_offs() {
        let cli = Cli::try_parse_from(["ragqa", "eval", "1", "items.jsonl", "--k", "2,4"]).unwrap();
        let Command::Eval { k, .. } = cli.command else {
            panic!("expected eval");
        };
        assert_eq!(k, vec![2, 4]);
    }

    #[test]
    fn test_rejects_unknown_backend() {
        let result = Cli::try_parse_from(["ragqa", "--embedding-backend", "nope", "info", "1"]);
        assert!(result.is_err());
    }
}
