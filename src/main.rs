use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use memo_runner::cli::{self, Cli, Commands};
use memo_runner::Config;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("memo_runner=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate(args) => {
            let config = Config::load(cli.config_file.as_deref())?;
            cli::generate::run(config, args).await
        }
        Commands::Config(args) => cli::config::run(cli.config_file, args).await,
        Commands::Completions(args) => cli::completions::run(args),
    }
}
