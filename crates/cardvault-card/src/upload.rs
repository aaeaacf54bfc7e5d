//! The upload envelope and the persisted original record.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use serde::Deserialize;
use serde_json::json;

use crate::error::{CardError, PayloadDecodeError, SchemaError};

/// Media type assumed for card uploads.
pub const PNG_MEDIA_TYPE: &str = "image/png";

/// An uploaded file with the metadata the client declared for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadEnvelope {
    /// Declared file name.
    pub file_name: String,
    /// Declared media type.
    pub media_type: String,
    /// Declared modification time, milliseconds since the Unix epoch.
    pub last_modified_ms: i64,
    /// Verbatim file bytes.
    pub bytes: Bytes,
    /// Where the upload came from (e.g. `upload`, `import`).
    pub origin: String,
}

/// Shape of the persisted original record.
#[derive(Deserialize)]
struct OriginalRecord {
    content: String,
    #[serde(rename = "lastModified")]
    last_modified: i64,
    name: String,
    #[serde(rename = "type")]
    media_type: String,
}

impl UploadEnvelope {
    /// Creates an envelope with modification time 0 and origin `upload`.
    pub fn new(file_name: impl Into<String>, media_type: impl Into<String>, bytes: Bytes) -> Self {
        Self {
            file_name: file_name.into(),
            media_type: media_type.into(),
            last_modified_ms: 0,
            bytes,
            origin: "upload".to_string(),
        }
    }

    /// Sets the declared modification time.
    #[must_use]
    pub fn with_last_modified(mut self, ms: i64) -> Self {
        self.last_modified_ms = ms;
        self
    }

    /// Sets the origin tag.
    #[must_use]
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    /// Size of the uploaded bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Renders the original record persisted alongside the character.
    ///
    /// The record is compact JSON with sorted keys:
    /// `{"content":"data:<type>;base64,<b64>","lastModified":..,"name":..,"size":..,"type":..}`.
    #[must_use]
    pub fn original_text(&self) -> String {
        json!({
            "content": format!("data:{};base64,{}", self.media_type, STANDARD.encode(&self.bytes)),
            "lastModified": self.last_modified_ms,
            "name": self.file_name,
            "size": self.bytes.len(),
            "type": self.media_type,
        })
        .to_string()
    }

    /// Reconstructs an envelope from a persisted original record.
    ///
    /// The origin is not part of the record and is set to `upload`.
    ///
    /// # Errors
    ///
    /// Returns [`CardError::Schema`] if the record is not the expected JSON
    /// shape, or [`CardError::Payload`] if its data URL is not Base64.
    pub fn from_original_text(text: &str) -> Result<Self, CardError> {
        let record: OriginalRecord =
            serde_json::from_str(text).map_err(SchemaError::InvalidJson)?;
        let encoded = record
            .content
            .split_once(";base64,")
            .filter(|(scheme, _)| scheme.starts_with("data:"))
            .map(|(_, data)| data)
            .ok_or_else(|| SchemaError::Unrecognized {
                reason: "original content is not a base64 data URL".to_string(),
            })?;
        let bytes = STANDARD.decode(encoded).map_err(PayloadDecodeError::from)?;
        Ok(Self::new(record.name, record.media_type, Bytes::from(bytes))
            .with_last_modified(record.last_modified))
    }
}
