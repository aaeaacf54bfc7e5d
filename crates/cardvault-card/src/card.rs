//! Whole-file card operations built on the chunk codec and transcoder.

use bytes::Bytes;

use crate::chunk;
use crate::document::CharacterCard;
use crate::error::{CardError, FormatError, Result, SchemaError};
use crate::normalize::normalize;
use crate::text_chunk::{embed_payload, extract_payload, strip_payload_chunks};

/// A card file split into its image and its definition text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedCard {
    /// The PNG with every `tEXt` chunk removed.
    pub clean_image: Bytes,
    /// Decoded definition JSON text, not yet normalized.
    pub definition_text: String,
}

/// Splits a card file into its clean image and its definition text.
///
/// # Errors
///
/// Returns [`CardError::Format`] for a malformed container,
/// [`CardError::Payload`] for a corrupt payload chunk, and
/// [`CardError::NoDefinitionFound`] when no payload chunk exists.
pub fn decode_card(bytes: &Bytes) -> Result<DecodedCard> {
    let chunks = chunk::parse(bytes)?;
    let payload = extract_payload(&chunks)?.ok_or(CardError::NoDefinitionFound)?;
    let clean_image = chunk::serialize(&strip_payload_chunks(&chunks));
    Ok(DecodedCard {
        clean_image,
        definition_text: payload.text,
    })
}

/// Decodes and normalizes a card file.
///
/// # Errors
///
/// Returns the errors of [`decode_card`], plus [`CardError::Schema`] when the
/// definition is not recognized.
pub fn read_card(bytes: &Bytes) -> Result<(Bytes, CharacterCard)> {
    let decoded = decode_card(bytes)?;
    let card = normalize(&decoded.definition_text)?;
    Ok((decoded.clean_image, card))
}

/// Removes every `tEXt` chunk from a PNG.
///
/// # Errors
///
/// Returns [`FormatError`] if the bytes are not a valid PNG.
pub fn strip_card(bytes: &Bytes) -> std::result::Result<Bytes, FormatError> {
    let chunks = chunk::parse(bytes)?;
    Ok(chunk::serialize(&strip_payload_chunks(&chunks)))
}

/// Embeds a card into a PNG, replacing any existing `tEXt` chunks.
///
/// # Errors
///
/// Returns [`CardError::Format`] if the image is not a valid PNG.
pub fn encode_card(image: &Bytes, card: &CharacterCard) -> Result<Bytes> {
    let text = serde_json::to_string(card).map_err(SchemaError::InvalidCurrent)?;
    let chunks = chunk::parse(image)?;
    Ok(chunk::serialize(&embed_payload(&chunks, &text)?))
}
