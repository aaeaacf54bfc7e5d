//! Fingerprint command - print original and content fingerprints.

use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use anyhow::{Context, Result};
use cardvault_card::upload::PNG_MEDIA_TYPE;
use cardvault_card::{UploadEnvelope, fingerprint_content, fingerprint_original, read_card};
use clap::Args;
use serde::Serialize;

use super::read_file;
use crate::Config;

/// Arguments for the fingerprint command.
#[derive(Debug, Args)]
pub struct FingerprintArgs {
    /// Card file to fingerprint.
    #[arg()]
    pub file: PathBuf,

    /// File name to declare instead of the path's file name.
    #[arg(long)]
    pub name: Option<String>,

    /// Modification time to declare, in milliseconds since the Unix epoch.
    /// Defaults to the file's modification time.
    #[arg(long)]
    pub last_modified: Option<i64>,
}

/// Both identities of a card upload.
#[derive(Debug, Serialize)]
pub struct FingerprintReport {
    /// SHA-256 of the original upload record.
    pub original: String,
    /// SHA-256 of the canonical normalized definition.
    pub content: String,
}

/// Computes both fingerprints of an upload.
///
/// # Errors
///
/// Returns an error if the upload carries no usable definition.
pub fn fingerprint(upload: &UploadEnvelope) -> Result<FingerprintReport> {
    let (_, card) = read_card(&upload.bytes).context("Failed to read character card")?;
    let content = fingerprint_content(&card).context("Failed to fingerprint definition")?;
    Ok(FingerprintReport {
        original: fingerprint_original(upload).to_string(),
        content: content.to_string(),
    })
}

fn modified_ms(path: &Path) -> Result<i64> {
    let modified = std::fs::metadata(path)
        .and_then(|meta| meta.modified())
        .with_context(|| format!("Failed to read modification time of {}", path.display()))?;
    let millis = modified
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    i64::try_from(millis).context("Modification time out of range")
}

/// Execute the fingerprint command.
///
/// # Errors
///
/// Returns an error if the file cannot be read or carries no usable definition.
pub fn execute(args: &FingerprintArgs, config: &Config) -> Result<()> {
    let bytes = read_file(&args.file)?;
    let name = match &args.name {
        Some(name) => name.clone(),
        None => args
            .file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
    };
    let last_modified = match args.last_modified {
        Some(ms) => ms,
        None => modified_ms(&args.file)?,
    };
    let upload = UploadEnvelope::new(name, PNG_MEDIA_TYPE, bytes).with_last_modified(last_modified);

    let report = fingerprint(&upload)?;
    config.emit(&report, |report| {
        println!("original {}", report.original);
        println!("content  {}", report.content);
    })
}
