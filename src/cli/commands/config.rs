//! Config command implementation.

use crate::core::config::Config;
use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use std::path::{Path, PathBuf};

/// Configuration operations.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Validate a configuration file.
    Validate {
        /// Config file path.
        #[arg(default_value = "config/datty.toml")]
        path: PathBuf,
    },
    /// Print the effective configuration, defaults included.
    Show {
        /// Output format (toml, json).
        #[arg(long, default_value = "toml")]
        format: String,
    },
}

/// Run the config command. `config` is the effective configuration after
/// global options were applied.
pub fn run_config(args: ConfigArgs, config: &Config) -> Result<()> {
    match args.command {
        ConfigCommand::Validate { path } => {
            validate_config(&path)?;
            println!("✓ Configuration is valid: {}", path.display());
            Ok(())
        }
        ConfigCommand::Show { format } => {
            println!("{}", show_config(config, &format)?);
            Ok(())
        }
    }
}

fn validate_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        anyhow::bail!("Config file not found: {:?}", path);
    }
    Config::from_file(path)
}

/// Render `config` in `format`.
pub fn show_config(config: &Config, format: &str) -> Result<String> {
    match format {
        "toml" => config.to_toml(),
        "json" => serde_json::to_string_pretty(config).with_context(|| "failed to render config"),
        other => anyhow::bail!("unknown format {:?}, expected toml or json", other),
    }
}
