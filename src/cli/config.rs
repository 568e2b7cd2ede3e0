//! `memo-run config` command implementation

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use crate::config::Config;

#[derive(Args)]
pub struct ConfigArgs {
    /// Write a config file with default values
    #[arg(long)]
    init: bool,
}

pub async fn run(path: Option<PathBuf>, args: ConfigArgs) -> Result<()> {
    let path = path.or_else(Config::default_path);

    if args.init {
        let path = path.context("No config directory available, pass --config-file")?;
        Config::default().write_new(&path)?;
        println!("✓ Wrote default config to {}", path.display());
        return Ok(());
    }

    let config = Config::load(path.as_deref())?;
    match &path {
        Some(p) if p.exists() => println!("# {}", p.display()),
        Some(p) => println!("# {} (not present, showing defaults)", p.display()),
        None => println!("# defaults"),
    }
    print!("{}", config.to_toml()?);
    Ok(())
}
