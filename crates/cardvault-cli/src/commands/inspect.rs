//! Inspect command - list chunks and report on the embedded definition.

use std::path::PathBuf;

use anyhow::{Context, Result};
use cardvault_card::chunk;
use cardvault_card::text_chunk::extract_payload;
use cardvault_card::{DocumentShape, classify};
use clap::Args;
use serde::Serialize;

use super::read_file;
use crate::Config;

/// Arguments for the inspect command.
#[derive(Debug, Args)]
pub struct InspectArgs {
    /// Card file to inspect.
    #[arg()]
    pub file: PathBuf,
}

/// One chunk of the file.
#[derive(Debug, Serialize)]
pub struct ChunkSummary {
    /// Four-character chunk type.
    pub kind: String,
    /// Data length in bytes.
    pub length: usize,
    /// Whether the stored CRC matches the chunk contents.
    pub crc_ok: bool,
}

/// State of the embedded definition.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PayloadStatus {
    /// No `chara` chunk.
    Missing,
    /// A `chara` chunk that could not be decoded.
    Corrupt {
        /// Decoding error.
        error: String,
    },
    /// A decodable `chara` chunk.
    Present {
        /// Index of the chunk carrying the payload.
        chunk_index: usize,
        /// Decoded text length in bytes.
        length: usize,
        /// `current`, `legacy`, `unrecognized` or `invalid_json`.
        shape: String,
    },
}

/// Result of inspecting a card file.
#[derive(Debug, Serialize)]
pub struct InspectReport {
    /// Total file size in bytes.
    pub size: usize,
    /// Chunks in file order.
    pub chunks: Vec<ChunkSummary>,
    /// Embedded definition.
    pub payload: PayloadStatus,
}

/// Builds the inspection report for `bytes`.
///
/// # Errors
///
/// Returns an error if `bytes` is not a valid PNG.
pub fn inspect(bytes: &bytes::Bytes) -> Result<InspectReport> {
    let chunks = chunk::parse(bytes).context("Not a valid PNG")?;
    let summaries = chunks
        .iter()
        .map(|c| ChunkSummary {
            kind: c.kind().to_string(),
            length: c.data().len(),
            crc_ok: c.crc_matches(),
        })
        .collect();

    let payload = match extract_payload(&chunks) {
        Ok(None) => PayloadStatus::Missing,
        Err(error) => PayloadStatus::Corrupt {
            error: error.to_string(),
        },
        Ok(Some(found)) => {
            let shape = match serde_json::from_str(found.text.trim_start_matches('\u{feff}')) {
                Ok(value) => match classify(&value) {
                    DocumentShape::Current => "current",
                    DocumentShape::Legacy => "legacy",
                    DocumentShape::Unrecognized(_) => "unrecognized",
                },
                Err(_) => "invalid_json",
            };
            PayloadStatus::Present {
                chunk_index: found.chunk_index,
                length: found.text.len(),
                shape: shape.to_string(),
            }
        }
    };

    Ok(InspectReport {
        size: bytes.len(),
        chunks: summaries,
        payload,
    })
}

/// Execute the inspect command.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a valid PNG.
pub fn execute(args: &InspectArgs, config: &Config) -> Result<()> {
    let bytes = read_file(&args.file)?;
    let report = inspect(&bytes)?;

    config.emit(&report, |report| {
        println!("{} ({} bytes)", args.file.display(), report.size);
        for (index, chunk) in report.chunks.iter().enumerate() {
            let crc = if chunk.crc_ok { "" } else { "  (bad CRC)" };
            println!("  [{index}] {} {} bytes{crc}", chunk.kind, chunk.length);
        }
        match &report.payload {
            PayloadStatus::Missing => println!("No character definition"),
            PayloadStatus::Corrupt { error } => println!("Corrupt character definition: {error}"),
            PayloadStatus::Present {
                chunk_index, shape, ..
            } => println!("Character definition in chunk {chunk_index} ({shape})"),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardvault_test_utils::{blank_png, card_png, legacy_definition};

    #[test]
    fn test_reports_payload_shape() {
        let report = inspect(&card_png(&legacy_definition("Ada"))).unwrap();

        assert_eq!(report.chunks.len(), 4);
        assert_eq!(report.chunks[2].kind, "tEXt");
        assert!(report.chunks.iter().all(|c| c.crc_ok));
        match report.payload {
            PayloadStatus::Present {
                chunk_index, shape, ..
            } => {
                assert_eq!(chunk_index, 2);
                assert_eq!(shape, "legacy");
            }
            other => panic!("unexpected payload status: {other:?}"),
        }
    }

    #[test]
    fn test_reports_missing_payload() {
        let report = inspect(&blank_png()).unwrap();
        assert!(matches!(report.payload, PayloadStatus::Missing));
    }

    #[test]
    fn test_rejects_non_png() {
        assert!(inspect(&bytes::Bytes::from_static(b"plain text")).is_err());
    }
}
