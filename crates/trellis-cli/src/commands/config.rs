//! Config command for managing CLI configuration

use std::path::Path;

use clap::{Args, Subcommand};

use crate::config::Config;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Get a config value
    Get {
        /// Dotted key, e.g. response.max_tokens
        key: String,
    },
    /// Set a config value
    Set {
        /// Dotted key, e.g. response.max_tokens
        key: String,
        /// New value
        value: String,
    },
    /// List all config values
    List,
    /// Show config file path
    Path,
    /// Write a config file with default values
    Init {
        /// Overwrite existing config
        #[arg(long)]
        force: bool,
    },
}

pub fn run(args: &ConfigArgs, path: &Path) -> anyhow::Result<()> {
    match &args.command {
        ConfigCommands::Get { key } => run_get(path, key),
        ConfigCommands::Set { key, value } => run_set(path, key, value),
        ConfigCommands::List => run_list(path),
        ConfigCommands::Path => {
            println!("{}", path.display());
            Ok(())
        }
        ConfigCommands::Init { force } => run_init(path, *force),
    }
}

fn run_get(path: &Path, key: &str) -> anyhow::Result<()> {
    let config = Config::load(path)?;
    match config.get(key)? {
        Some(value) => println!("{}", value),
        None => println!("(not set)"),
    }
    Ok(())
}

fn run_set(path: &Path, key: &str, value: &str) -> anyhow::Result<()> {
    let mut config = Config::load(path)?;
    config.set(key, value)?;
    config.save(path)?;
    tracing::info!("Updated {}", path.display());
    println!("Set {} = {}", key, value);
    Ok(())
}

fn run_list(path: &Path) -> anyhow::Result<()> {
    let config = Config::load(path)?;
    println!("Config file: {}", path.display());
    println!();
    for key in Config::keys() {
        let value = config.get(key)?.unwrap_or_else(|| "(not set)".to_string());
        println!("{} = {}", key, value);
    }
    Ok(())
}

fn run_init(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "Config file already exists at {}. Use --force to overwrite.",
            path.display()
        );
    }

    Config::default().save(path)?;
    println!("Created config file at {}", path.display());
    Ok(())
}
