//! Datty - codec tooling entrypoint.
//!
//! Usage:
//!   datty inspect 82a16192010201c0 --as tokens
//!   datty inspect --file op.bin --as op
//!   datty encode '{"name": "John", "tags": ["a", "b"]}'
//!   datty config validate config/datty.toml
//!   datty --config config/datty.toml config show --format json

use anyhow::Result;
use clap::Parser;
use datty::cli::commands::{run_config, run_encode, run_inspect};
use datty::cli::{init_tracing, load_config, Cli, Commands};
use datty::core::config::ConfigOverrides;
use std::path::PathBuf;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let overrides = ConfigOverrides {
        log_level: cli.log_level.clone(),
        numeric_keys: None,
    };
    let config_path = cli.config.as_ref().map(PathBuf::from);
    let config = load_config(config_path.as_deref(), &overrides)?;
    init_tracing(&config.telemetry.log_level);

    match cli.command {
        Commands::Inspect(args) => run_inspect(args, &config),
        Commands::Encode(args) => run_encode(args, &config),
        Commands::Config(args) => run_config(args, &config),
    }
}
