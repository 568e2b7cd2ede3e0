//! Command-line interface

pub mod completions;
pub mod config;
pub mod generate;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "memo-run",
    version,
    about = "Run talking-face video generation with unified progress reporting"
)]
pub struct Cli {
    /// Configuration file (defaults to <config dir>/memo-runner/config.toml)
    #[arg(long, global = true, env = "MEMO_RUNNER_CONFIG")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate a video from a portrait image and an audio clip
    Generate(generate::GenerateArgs),

    /// Show or initialise the configuration file
    Config(config::ConfigArgs),

    /// Print shell completions
    Completions(completions::CompletionsArgs),
}
