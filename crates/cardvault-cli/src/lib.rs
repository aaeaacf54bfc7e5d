//! # cardvault-cli
//!
//! Command-line tools for character card files.
//!
//! ## Commands
//!
//! - `cardvault inspect` - List chunks and report on the embedded definition
//! - `cardvault extract` - Print the normalized definition
//! - `cardvault strip` - Write the image without text chunks
//! - `cardvault embed` - Embed a definition into an image
//! - `cardvault fingerprint` - Print original and content fingerprints
//!
//! ## Configuration
//!
//! - `CARDVAULT_OUTPUT` - Output format, `text` or `json` (default: `text`)
//! - `CARDVAULT_JSON_LOGS` - Emit logs as JSON
//! - `RUST_LOG` - Log filter (default: `warn`)

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]
// CLI uses print! macros intentionally
#![allow(clippy::print_stdout)]
#![allow(clippy::print_stderr)]

pub mod commands;

use clap::{Parser, Subcommand};
use serde::Serialize;

/// Character card command-line tools.
#[derive(Debug, Parser)]
#[command(name = "cardvault")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Output format.
    #[arg(long, env = "CARDVAULT_OUTPUT", default_value = "text")]
    pub format: OutputFormat,

    /// Emit logs as JSON instead of human-readable lines.
    #[arg(long, env = "CARDVAULT_JSON_LOGS")]
    pub json_logs: bool,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Get the effective configuration.
    #[must_use]
    pub fn config(&self) -> Config {
        Config {
            format: self.format,
        }
    }
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List chunks and report on the embedded definition.
    Inspect(commands::inspect::InspectArgs),
    /// Print the normalized definition of a card.
    Extract(commands::extract::ExtractArgs),
    /// Write the image with every text chunk removed.
    Strip(commands::strip::StripArgs),
    /// Embed a definition into an image.
    Embed(commands::embed::EmbedArgs),
    /// Print the original and content fingerprints of a card.
    Fingerprint(commands::fingerprint::FingerprintArgs),
}

/// Output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output.
    Json,
}

/// CLI configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct Config {
    /// Output format.
    pub format: OutputFormat,
}

impl Config {
    /// Prints `report` as pretty JSON, or through `text` otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if the report cannot be serialized.
    pub fn emit<T: Serialize>(&self, report: &T, text: impl FnOnce(&T)) -> anyhow::Result<()> {
        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
            OutputFormat::Text => text(report),
        }
        Ok(())
    }
}
