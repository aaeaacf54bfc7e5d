//! Identity hashes used for deduplication.
//!
//! Two independent fingerprints are computed per upload:
//!
//! - [`OriginalFingerprint`] identifies the physical file: SHA-256 of the
//!   exact original record text that is persisted.
//! - [`ContentFingerprint`] identifies the logical character: SHA-256 of the
//!   canonical JSON form of the normalized card, so key order and whitespace
//!   in the source text do not matter.

use std::fmt;

use cardvault_core::canonical_json::canonical_sha256;
use cardvault_core::sha256_hex;
use serde::{Deserialize, Serialize};

use crate::document::CharacterCard;
use crate::error::SchemaError;
use crate::upload::UploadEnvelope;

/// Identity of the verbatim uploaded file and its declared metadata.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OriginalFingerprint(String);

impl OriginalFingerprint {
    /// Wraps an existing lowercase hex digest.
    #[must_use]
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    /// Returns the hex digest.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OriginalFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of a normalized character definition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentFingerprint(String);

impl ContentFingerprint {
    /// Wraps an existing lowercase hex digest.
    #[must_use]
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    /// Returns the hex digest.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fingerprints the original record exactly as it is persisted.
#[must_use]
pub fn fingerprint_original(upload: &UploadEnvelope) -> OriginalFingerprint {
    fingerprint_original_text(&upload.original_text())
}

/// Fingerprints an already-rendered original record text.
#[must_use]
pub fn fingerprint_original_text(text: &str) -> OriginalFingerprint {
    OriginalFingerprint(sha256_hex(text.as_bytes()))
}

/// Fingerprints the canonical form of a normalized card.
///
/// # Errors
///
/// Returns [`SchemaError::Canonical`] only if the card cannot be serialized,
/// which does not happen for cards produced by deserialization.
pub fn fingerprint_content(card: &CharacterCard) -> Result<ContentFingerprint, SchemaError> {
    Ok(ContentFingerprint(canonical_sha256(card)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize;
    use bytes::Bytes;

    #[test]
    fn content_ignores_key_order_and_whitespace() {
        let a = r#"{"spec":"chara_card_v2","spec_version":"2.0","data":{"name":"X","description":"d","tags":["a"]}}"#;
        let b = r#"{
            "data": { "tags": [ "a" ], "description": "d", "name": "X" },
            "spec_version": "2.0",
            "spec": "chara_card_v2"
        }"#;
        let fa = fingerprint_content(&normalize(a).unwrap()).unwrap();
        let fb = fingerprint_content(&normalize(b).unwrap()).unwrap();
        assert_eq!(fa, fb);
        assert_eq!(fa.as_str().len(), 64);
    }

    #[test]
    fn content_differs_on_value_change() {
        let a = r#"{"spec":"chara_card_v2","spec_version":"2.0","data":{"name":"X"}}"#;
        let b = r#"{"spec":"chara_card_v2","spec_version":"2.0","data":{"name":"Y"}}"#;
        assert_ne!(
            fingerprint_content(&normalize(a).unwrap()).unwrap(),
            fingerprint_content(&normalize(b).unwrap()).unwrap()
        );
    }

    #[test]
    fn original_covers_metadata() {
        let bytes = Bytes::from_static(b"\x89PNG....");
        let a = UploadEnvelope::new("a.png", "image/png", bytes.clone()).with_last_modified(1);
        let b = UploadEnvelope::new("a.png", "image/png", bytes.clone()).with_last_modified(2);
        let c = UploadEnvelope::new("b.png", "image/png", bytes).with_last_modified(1);
        assert_eq!(fingerprint_original(&a), fingerprint_original(&a.clone()));
        assert_ne!(fingerprint_original(&a), fingerprint_original(&b));
        assert_ne!(fingerprint_original(&a), fingerprint_original(&c));
        assert_eq!(
            fingerprint_original(&a),
            fingerprint_original_text(&a.original_text())
        );
    }
}
