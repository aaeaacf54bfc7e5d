//! Strip command - write the image with every text chunk removed.

use std::path::PathBuf;

use anyhow::{Context, Result};
use cardvault_card::strip_card;
use clap::Args;
use serde::Serialize;

use super::{read_file, write_file};
use crate::Config;

/// Arguments for the strip command.
#[derive(Debug, Args)]
pub struct StripArgs {
    /// Card file to strip.
    #[arg()]
    pub file: PathBuf,

    /// Where to write the clean image.
    #[arg(long, short = 'o')]
    pub output: PathBuf,
}

/// Sizes before and after stripping.
#[derive(Debug, Serialize)]
pub struct StripReport {
    /// Input size in bytes.
    pub input_size: usize,
    /// Output size in bytes.
    pub output_size: usize,
}

/// Execute the strip command.
///
/// # Errors
///
/// Returns an error if the input is not a valid PNG or a file operation fails.
pub fn execute(args: &StripArgs, config: &Config) -> Result<()> {
    let bytes = read_file(&args.file)?;
    let clean = strip_card(&bytes).context("Not a valid PNG")?;
    write_file(&args.output, &clean)?;

    let report = StripReport {
        input_size: bytes.len(),
        output_size: clean.len(),
    };
    config.emit(&report, |report| {
        println!(
            "Wrote {} ({} bytes, {} removed)",
            args.output.display(),
            report.output_size,
            report.input_size - report.output_size
        );
    })
}
