//! Error types for card decoding and normalization.
//!
//! Each stage of decoding has its own error so callers can map failures to
//! distinct outcomes: a malformed container, a corrupt embedded payload, and
//! an unrecognized definition are different problems for the uploader.

use cardvault_core::canonical_json::CanonicalJsonError;
use thiserror::Error;

/// Result type alias for card operations.
pub type Result<T> = std::result::Result<T, CardError>;

/// The byte stream is not a usable PNG container.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// The fixed 8-byte PNG signature is absent.
    #[error("missing PNG signature")]
    MissingSignature,

    /// A chunk header or body extends past the end of the buffer.
    #[error("chunk at offset {offset} needs {needed} bytes but only {available} remain")]
    Truncated {
        /// Offset of the chunk that is cut short.
        offset: usize,
        /// Bytes the chunk declares (header, data and CRC).
        needed: usize,
        /// Bytes left in the buffer from `offset`.
        available: usize,
    },

    /// A chunk declares a length above the PNG limit of `2^31 - 1`.
    #[error("chunk at offset {offset} declares invalid length {length}")]
    ChunkTooLarge {
        /// Offset of the offending chunk.
        offset: usize,
        /// Declared data length.
        length: u32,
    },

    /// The stream has no terminal `IEND` chunk.
    #[error("no IEND chunk found")]
    MissingEnd,

    /// The upload exceeds the configured size limit.
    #[error("upload of {size} bytes exceeds limit of {limit} bytes")]
    TooLarge {
        /// Upload size in bytes.
        size: usize,
        /// Configured limit in bytes.
        limit: usize,
    },
}

/// The embedded payload chunk exists but its contents are corrupt.
#[derive(Debug, Error)]
pub enum PayloadDecodeError {
    /// The chunk text is not valid Base64.
    #[error("payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    /// The decoded bytes are not valid UTF-8.
    #[error("payload is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// The payload is not a recognized character definition.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The text is not valid JSON.
    #[error("definition is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    /// The JSON matches neither the current nor the legacy shape.
    #[error("unsupported character definition format: {reason}")]
    Unrecognized {
        /// Why classification failed.
        reason: String,
    },

    /// The JSON has the current envelope but its fields have the wrong types.
    #[error("malformed chara_card_v2 document: {0}")]
    InvalidCurrent(#[source] serde_json::Error),

    /// The JSON has the legacy shape but its fields have the wrong types.
    #[error("malformed legacy character document: {0}")]
    InvalidLegacy(#[source] serde_json::Error),

    /// The document could not be brought into canonical form.
    #[error("failed to canonicalize definition: {0}")]
    Canonical(#[from] CanonicalJsonError),
}

/// Any failure while decoding a card image.
#[derive(Debug, Error)]
pub enum CardError {
    /// Malformed container.
    #[error(transparent)]
    Format(#[from] FormatError),

    /// Corrupt embedded payload.
    #[error(transparent)]
    Payload(#[from] PayloadDecodeError),

    /// Unrecognized definition.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// The container carries no definition payload.
    #[error("no character definition found in PNG")]
    NoDefinitionFound,
}
