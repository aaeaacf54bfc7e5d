//! CLI command implementations.

pub mod embed;
pub mod extract;
pub mod fingerprint;
pub mod inspect;
pub mod strip;

use std::path::Path;

use anyhow::{Context, Result};
use bytes::Bytes;

/// Reads a whole file.
pub(crate) fn read_file(path: &Path) -> Result<Bytes> {
    std::fs::read(path)
        .map(Bytes::from)
        .with_context(|| format!("Failed to read {}", path.display()))
}

/// Writes a whole file, replacing it if present.
pub(crate) fn write_file(path: &Path, data: &[u8]) -> Result<()> {
    std::fs::write(path, data).with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::debug!(path = %path.display(), bytes = data.len(), "wrote file");
    Ok(())
}
