//! Cardvault CLI - command-line tools for character card files.
//!
//! The main entry point for the `cardvault` binary.

use anyhow::Result;
use clap::Parser;

use cardvault_cli::{Cli, Commands, commands};
use cardvault_core::{LogFormat, init_logging};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(if cli.json_logs {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    });
    let config = cli.config();

    match cli.command {
        Commands::Inspect(args) => commands::inspect::execute(&args, &config),
        Commands::Extract(args) => commands::extract::execute(&args, &config),
        Commands::Strip(args) => commands::strip::execute(&args, &config),
        Commands::Embed(args) => commands::embed::execute(&args, &config),
        Commands::Fingerprint(args) => commands::fingerprint::execute(&args, &config),
    }
}
