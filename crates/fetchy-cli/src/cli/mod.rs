//! CLI for running fetchy request manifests.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use fetchy_core::config;
use std::path::PathBuf;

use commands::{run_check, run_manifest};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "fetchy")]
#[command(about = "fetchy: run a list of HTTP requests with bounded concurrency", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Run every request in a manifest and print the final states.
    Run {
        /// Path to the manifest TOML file.
        manifest: PathBuf,
        /// Requests in flight at once (overrides the manifest and config).
        #[arg(long, short = 'c', value_name = "N")]
        concurrency: Option<usize>,
    },

    /// Validate a manifest without sending anything.
    Check {
        /// Path to the manifest TOML file.
        manifest: PathBuf,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();

        match cli.command {
            CliCommand::Run {
                manifest,
                concurrency,
            } => {
                let cfg = config::load_or_init()?;
                tracing::debug!("loaded config: {:?}", cfg);
                run_manifest(&cfg, &manifest, concurrency).await?;
            }
            CliCommand::Check { manifest } => run_check(&manifest)?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
