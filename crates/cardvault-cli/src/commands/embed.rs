//! Embed command - write a definition into an image.

use std::path::PathBuf;

use anyhow::{Context, Result};
use cardvault_card::{encode_card, normalize};
use clap::Args;
use serde::Serialize;

use super::{read_file, write_file};
use crate::Config;

/// Arguments for the embed command.
#[derive(Debug, Args)]
pub struct EmbedArgs {
    /// PNG image to embed into. Existing text chunks are replaced.
    #[arg()]
    pub image: PathBuf,

    /// Definition JSON, legacy or `chara_card_v2`.
    #[arg()]
    pub definition: PathBuf,

    /// Where to write the card.
    #[arg(long, short = 'o')]
    pub output: PathBuf,
}

/// What was embedded.
#[derive(Debug, Serialize)]
pub struct EmbedReport {
    /// Character name from the definition.
    pub name: String,
    /// Output size in bytes.
    pub size: usize,
}

/// Execute the embed command.
///
/// The definition is normalized before embedding, so legacy input is written
/// as a `chara_card_v2` document.
///
/// # Errors
///
/// Returns an error if the definition is not recognized, the image is not a
/// valid PNG, or a file operation fails.
pub fn execute(args: &EmbedArgs, config: &Config) -> Result<()> {
    let image = read_file(&args.image)?;
    let text = std::fs::read_to_string(&args.definition)
        .with_context(|| format!("Failed to read {}", args.definition.display()))?;
    let card = normalize(&text)
        .with_context(|| format!("Unsupported definition in {}", args.definition.display()))?;

    let output = encode_card(&image, &card).context("Failed to embed definition")?;
    write_file(&args.output, &output)?;

    let report = EmbedReport {
        name: card.data.name.clone(),
        size: output.len(),
    };
    config.emit(&report, |report| {
        println!(
            "Embedded '{}' into {} ({} bytes)",
            report.name,
            args.output.display(),
            report.size
        );
    })
}
