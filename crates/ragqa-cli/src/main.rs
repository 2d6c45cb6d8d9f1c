#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod command;
mod config;
mod telemetry;

use std::process;

use anyhow::Context;

use crate::config::Cli;

// Tracing target constants
pub const TRACING_TARGET_STARTUP: &str = "ragqa_cli::startup";
pub const TRACING_TARGET_CONFIG: &str = "ragqa_cli::config";
pub const TRACING_TARGET_COMMAND: &str = "ragqa_cli::command";

#[tokio::main]
async fn main() {
    let Err(error) = run().await else {
        process::exit(0);
    };

    if tracing::enabled!(tracing::Level::ERROR) {
        tracing::error!(
            target: TRACING_TARGET_COMMAND,
            error = format!("{error:#}"),
            "command failed"
        );
    } else {
        eprintln!("Error: {error:#}");
    }

    process::exit(1);
}

/// Main application entry point.
async fn run() -> anyhow::Result<()> {
    let cli = Cli::init();

    telemetry::init_tracing(&cli.log)?;
    cli.log();
    cli.validate().context("invalid configuration")?;

    let Cli {
        postgres,
        vector,
        provider,
        chunking,
        templates,
        log: _,
        command,
    } = cli;

    let context = command::Context::new(postgres, vector, provider, chunking, templates)?;
    command.execute(&context).await
}
