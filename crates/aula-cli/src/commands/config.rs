//! Print, check or write the configuration.

use std::path::PathBuf;

use aula_config::{ReverbConfig, default_config_path};
use clap::Args;

use super::common::load_config;

#[derive(Args)]
pub struct ConfigArgs {
    /// Write the default configuration to this file
    #[arg(short, long)]
    write: Option<PathBuf>,

    /// Validate a configuration file and print it
    #[arg(long, conflicts_with = "write")]
    check: Option<PathBuf>,

    /// Print the user configuration path
    #[arg(long)]
    path: bool,
}

pub fn run(args: ConfigArgs) -> anyhow::Result<()> {
    if args.path {
        println!("{}", default_config_path().display());
        return Ok(());
    }

    if let Some(path) = args.write {
        ReverbConfig::default().save(&path)?;
        println!("Wrote default configuration to {}", path.display());
        return Ok(());
    }

    let config = match args.check {
        Some(path) => load_config(Some(&path))?,
        None => ReverbConfig::default(),
    };
    print!("{}", config.to_toml()?);
    Ok(())
}
