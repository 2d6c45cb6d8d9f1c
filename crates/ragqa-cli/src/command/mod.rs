//! Sub-commands.

mod context;
mod index;
mod query;

use std::io::{self, Write};
use std::path::PathBuf;

use clap::Subcommand;
pub use context::Context;
use serde::Serialize;

/// Cut-offs scored by `eval` when none are given.
const DEFAULT_EVAL_K: &str = "1,3,5";

/// Operation to run.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Apply pending database migrations.
    Migrate,

    /// Split a text file into chunks and persist them for a project.
    Process {
        /// Project identifier.
        project_id: i32,
        /// UTF-8 text file to split.
        file: PathBuf,
        /// Delete the project's existing chunks first.
        #[arg(long)]
        reset: bool,
    },

    /// Embed a project's chunks and insert them into its collection.
    Push {
        /// Project identifier.
        project_id: i32,
        /// Recreate the collection first.
        #[arg(long)]
        reset: bool,
        /// Chunks embedded per round trip.
        #[arg(long, default_value_t = ragqa_rig::rag::DEFAULT_PAGE_SIZE)]
        page_size: i64,
    },

    /// Describe a project's collection.
    Info {
        /// Project identifier.
        project_id: i32,
    },

    /// Drop a project's collection.
    Reset {
        /// Project identifier.
        project_id: i32,
    },

    /// Rank a project's documents for a query.
    Search {
        /// Project identifier.
        project_id: i32,
        /// Query text.
        text: String,
        /// Maximum number of documents.
        #[arg(long, default_value_t = 5)]
        limit: usize,
    },

    /// Answer a query from a project's documents.
    Answer {
        /// Project identifier.
        project_id: i32,
        /// Query text.
        text: String,
        /// Maximum number of documents placed in the prompt.
        #[arg(long, default_value_t = 5)]
        limit: usize,
    },

    /// Score retrieval against labelled queries.
    Eval {
        /// Project identifier.
        project_id: i32,
        /// JSON Lines file of `{query, ground_truth_doc_ids, ground_truth_answer}`.
        file: PathBuf,
        /// Cut-offs to score.
        #[arg(long, value_delimiter = ',', default_value = DEFAULT_EVAL_K)]
        k: Vec<usize>,
    },
}

impl Command {
    /// Runs the command and prints its result as JSON on stdout.
    pub async fn execute(self, context: &Context) -> anyhow::Result<()> {
        match self {
            Self::Migrate => index::migrate(context).await,
            Self::Process {
                project_id,
                file,
                reset,
            } => index::process(context, project_id, &file, reset).await,
            Self::Push {
                project_id,
                reset,
                page_size,
            } => index::push(context, project_id, reset, page_size).await,
            Self::Info { project_id } => index::info(context, project_id).await,
            Self::Reset { project_id } => index::reset(context, project_id).await,
            Self::Search {
                project_id,
                text,
                limit,
            } => query::search(context, project_id, &text, limit).await,
            Self::Answer {
                project_id,
                text,
                limit,
            } => query::answer(context, project_id, &text, limit).await,
            Self::Eval { project_id, file, k } => query::eval(context, project_id, &file, &k).await,
        }
    }
}

/// Writes `value` to stdout as pretty-printed JSON.
fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value)?;
    writeln!(stdout)?;
    Ok(())
}
