use std::fs;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use memo_runner::cli::Cli;

#[derive(Parser)]
struct Xtask {
    #[command(subcommand)]
    command: Task,
}

#[derive(Subcommand)]
enum Task {
    /// Regenerate the CLI reference in docs/cli.md
    GenDocs {
        #[arg(long, default_value = "docs/cli.md")]
        output: PathBuf,
    },
}

fn main() -> std::io::Result<()> {
    match Xtask::parse().command {
        Task::GenDocs { output } => {
            let markdown = clap_markdown::help_markdown::<Cli>();
            if let Some(parent) = output.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&output, markdown)?;
            println!("wrote {}", output.display());
        }
    }
    Ok(())
}
