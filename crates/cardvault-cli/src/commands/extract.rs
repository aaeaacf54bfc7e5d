//! Extract command - print the normalized definition of a card.

use std::path::PathBuf;

use anyhow::{Context, Result};
use cardvault_card::read_card;
use clap::Args;

use super::{read_file, write_file};
use crate::Config;

/// Arguments for the extract command.
#[derive(Debug, Args)]
pub struct ExtractArgs {
    /// Card file to read.
    #[arg()]
    pub file: PathBuf,

    /// Write the definition to this file instead of standard output.
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

/// Returns the normalized definition of a card as pretty JSON.
///
/// Legacy definitions are migrated and lorebook positions repaired.
///
/// # Errors
///
/// Returns an error if the card has no usable definition.
pub fn extract(bytes: &bytes::Bytes) -> Result<String> {
    let (_, card) = read_card(bytes).context("Failed to read character card")?;
    serde_json::to_string_pretty(&card).context("Failed to serialize definition")
}

/// Execute the extract command.
///
/// The definition is always JSON; `--format` does not apply.
///
/// # Errors
///
/// Returns an error if the file cannot be read or written, or carries no
/// usable definition.
pub fn execute(args: &ExtractArgs, _config: &Config) -> Result<()> {
    let definition = extract(&read_file(&args.file)?)?;
    match &args.output {
        Some(path) => write_file(path, definition.as_bytes()),
        None => {
            println!("{definition}");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardvault_test_utils::{blank_png, card_png, legacy_definition};

    #[test]
    fn test_extract_migrates_legacy() {
        let json = extract(&card_png(&legacy_definition("Ada"))).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["spec"], "chara_card_v2");
        assert_eq!(value["data"]["name"], "Ada");
    }

    #[test]
    fn test_extract_without_definition_fails() {
        let err = extract(&blank_png()).unwrap_err();
        assert!(format!("{err:#}").contains("no character definition"), "{err:#}");
    }
}
