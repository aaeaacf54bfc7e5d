//! Transcoder for the `tEXt` chunk that carries a character definition.
//!
//! A card stores its definition as a `tEXt` chunk with the keyword `chara`.
//! The text is the Base64 encoding of the UTF-8 JSON document, since `tEXt`
//! itself only holds Latin-1.
//!
//! - Extraction scans in order and stops at the first `chara` chunk
//!   (keyword compared case-insensitively).
//! - Stripping removes every `tEXt` chunk, whatever its keyword.
//! - Embedding strips first, then inserts exactly one `chara` chunk directly
//!   before `IEND`.

use base64::Engine as _;
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD};
use base64::engine::DecodePaddingMode;
use bytes::{BufMut, Bytes, BytesMut};

use crate::chunk::{Chunk, ChunkType, end_index};
use crate::error::{FormatError, PayloadDecodeError};

/// Keyword reserved for the character definition payload.
pub const CARD_KEYWORD: &str = "chara";

/// Base64 decoder with browser `atob` leniency: padding is optional and
/// non-zero bits in the last symbol are discarded.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Keyword/text pair decoded from a `tEXt` chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEntry {
    /// Keyword, decoded from Latin-1.
    pub keyword: String,
    /// Text, decoded from Latin-1.
    pub text: String,
}

impl TextEntry {
    /// Decodes `keyword NUL text`. Returns `None` if there is no separator.
    #[must_use]
    pub fn decode(data: &[u8]) -> Option<Self> {
        let nul = data.iter().position(|&b| b == 0)?;
        Some(Self {
            keyword: latin1_to_string(&data[..nul]),
            text: latin1_to_string(&data[nul + 1..]),
        })
    }

    /// Encodes as `keyword NUL text`.
    ///
    /// Both parts must be Latin-1; characters above U+00FF are replaced by `?`.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        let mut out = BytesMut::with_capacity(self.keyword.len() + 1 + self.text.len());
        put_latin1(&mut out, &self.keyword);
        out.put_u8(0);
        put_latin1(&mut out, &self.text);
        out.freeze()
    }

    fn is_card_payload(&self) -> bool {
        self.keyword.eq_ignore_ascii_case(CARD_KEYWORD)
    }
}

fn latin1_to_string(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

fn put_latin1(out: &mut BytesMut, s: &str) {
    for c in s.chars() {
        out.put_u8(u8::try_from(u32::from(c)).unwrap_or(b'?'));
    }
}

/// A decoded definition payload and where it was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedPayload {
    /// The decoded UTF-8 text.
    pub text: String,
    /// Index of the source chunk in the chunk list.
    pub chunk_index: usize,
}

/// Finds and decodes the first `chara` payload.
///
/// Returns `Ok(None)` when no `chara` chunk exists or its decoded text is
/// empty.
///
/// # Errors
///
/// Returns [`PayloadDecodeError`] if the first matching chunk is not valid
/// Base64 or does not decode to UTF-8. Later matching chunks are not consulted.
pub fn extract_payload(chunks: &[Chunk]) -> Result<Option<ExtractedPayload>, PayloadDecodeError> {
    let found = chunks.iter().enumerate().find_map(|(index, chunk)| {
        if chunk.kind() != ChunkType::TEXT {
            return None;
        }
        TextEntry::decode(chunk.data())
            .filter(TextEntry::is_card_payload)
            .map(|entry| (index, entry))
    });

    let Some((chunk_index, entry)) = found else {
        return Ok(None);
    };

    let text = decode_payload_text(&entry.text)?;
    if text.is_empty() {
        return Ok(None);
    }
    Ok(Some(ExtractedPayload { text, chunk_index }))
}

/// Removes every `tEXt` chunk, preserving the order of the rest.
#[must_use]
pub fn strip_payload_chunks(chunks: &[Chunk]) -> Vec<Chunk> {
    chunks
        .iter()
        .filter(|c| c.kind() != ChunkType::TEXT)
        .cloned()
        .collect()
}

/// Embeds `text` as the single `chara` chunk directly before `IEND`.
///
/// Existing `tEXt` chunks are removed first so the payload is never duplicated.
///
/// # Errors
///
/// Returns [`FormatError::MissingEnd`] if `chunks` has no terminal chunk.
pub fn embed_payload(chunks: &[Chunk], text: &str) -> Result<Vec<Chunk>, FormatError> {
    let mut out = strip_payload_chunks(chunks);
    let end = end_index(&out).ok_or(FormatError::MissingEnd)?;
    out.insert(end, payload_chunk(text));
    Ok(out)
}

/// Builds a `chara` chunk carrying `text`.
#[must_use]
pub fn payload_chunk(text: &str) -> Chunk {
    let entry = TextEntry {
        keyword: CARD_KEYWORD.to_string(),
        text: STANDARD.encode(text.as_bytes()),
    };
    Chunk::new(ChunkType::TEXT, entry.encode())
}

/// Decodes Base64 text (whitespace-tolerant, padding optional) into UTF-8.
///
/// # Errors
///
/// Returns [`PayloadDecodeError`] on invalid Base64 or invalid UTF-8.
pub fn decode_payload_text(encoded: &str) -> Result<String, PayloadDecodeError> {
    let compact: String = encoded
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    let bytes = LENIENT_BASE64.decode(compact.as_bytes())?;
    Ok(String::from_utf8(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::{parse, serialize};

    fn base_chunks() -> Vec<Chunk> {
        vec![
            Chunk::new(ChunkType::IHDR, vec![0u8; 13]),
            Chunk::new(ChunkType::IDAT, vec![7u8; 5]),
            Chunk::new(ChunkType::IEND, Bytes::new()),
        ]
    }

    fn text_chunk(keyword: &str, text: &str) -> Chunk {
        let entry = TextEntry {
            keyword: keyword.to_string(),
            text: text.to_string(),
        };
        Chunk::new(ChunkType::TEXT, entry.encode())
    }

    #[test]
    fn embed_then_extract_returns_text() {
        let embedded = embed_payload(&base_chunks(), "{\"name\":\"Zoë\"}").unwrap();
        let payload = extract_payload(&embedded).unwrap().expect("payload");
        assert_eq!(payload.text, "{\"name\":\"Zoë\"}");
        assert_eq!(payload.chunk_index, 2);
        assert!(embedded.last().unwrap().is_end());
    }

    #[test]
    fn embed_replaces_existing_text_chunks() {
        let mut chunks = base_chunks();
        chunks.insert(1, text_chunk("chara", &STANDARD.encode("old")));
        chunks.insert(1, text_chunk("Comment", "hello"));

        let embedded = embed_payload(&chunks, "new").unwrap();
        let text_count = embedded
            .iter()
            .filter(|c| c.kind() == ChunkType::TEXT)
            .count();
        assert_eq!(text_count, 1);
        assert_eq!(extract_payload(&embedded).unwrap().unwrap().text, "new");
    }

    #[test]
    fn embed_without_end_fails() {
        let chunks = vec![Chunk::new(ChunkType::IHDR, vec![0u8; 13])];
        assert_eq!(embed_payload(&chunks, "x"), Err(FormatError::MissingEnd));
    }

    #[test]
    fn keyword_match_is_case_insensitive_and_first_wins() {
        let mut chunks = base_chunks();
        chunks.insert(1, text_chunk("CHARA", &STANDARD.encode("first")));
        chunks.insert(2, text_chunk("chara", &STANDARD.encode("second")));

        let payload = extract_payload(&chunks).unwrap().unwrap();
        assert_eq!(payload.text, "first");
        assert_eq!(payload.chunk_index, 1);
    }

    #[test]
    fn other_keywords_are_ignored_for_extraction_but_stripped() {
        let mut chunks = base_chunks();
        chunks.insert(1, text_chunk("Software", "paint"));
        assert_eq!(extract_payload(&chunks).unwrap(), None);

        let stripped = strip_payload_chunks(&chunks);
        assert_eq!(stripped, base_chunks());
    }

    #[test]
    fn empty_payload_is_none() {
        let mut chunks = base_chunks();
        chunks.insert(1, text_chunk("chara", ""));
        assert_eq!(extract_payload(&chunks).unwrap(), None);
    }

    #[test]
    fn corrupt_base64_is_an_error() {
        let mut chunks = base_chunks();
        chunks.insert(1, text_chunk("chara", "!!!not base64!!!"));
        assert!(matches!(
            extract_payload(&chunks),
            Err(PayloadDecodeError::Base64(_))
        ));
    }

    #[test]
    fn invalid_utf8_is_an_error() {
        let mut chunks = base_chunks();
        chunks.insert(1, text_chunk("chara", &STANDARD.encode([0xFF, 0xFE, 0xFD])));
        assert!(matches!(
            extract_payload(&chunks),
            Err(PayloadDecodeError::Utf8(_))
        ));
    }

    #[test]
    fn lenient_base64_accepts_whitespace_and_missing_padding() {
        assert_eq!(decode_payload_text("eyJh\nIjox\r\nfQ").unwrap(), "{\"a\":1}");
        assert_eq!(decode_payload_text("YQ").unwrap(), "a");
    }

    #[test]
    fn lenient_base64_discards_trailing_bits() {
        assert_eq!(decode_payload_text("YR").unwrap(), "a");
        assert_eq!(decode_payload_text("YR==").unwrap(), "a");
        assert_eq!(decode_payload_text("eyJhIjoxfR").unwrap(), "{\"a\":1}");
    }

    #[test]
    fn chunk_without_separator_is_not_a_match() {
        let mut chunks = base_chunks();
        chunks.insert(1, Chunk::new(ChunkType::TEXT, Bytes::from_static(b"chara")));
        assert_eq!(extract_payload(&chunks).unwrap(), None);
    }

    #[test]
    fn latin1_entry_roundtrip() {
        let entry = TextEntry {
            keyword: "Author".into(),
            text: "Ren\u{e9}e".into(),
        };
        let encoded = entry.encode();
        assert_eq!(&encoded[..], b"Author\0Ren\xe9e");
        assert_eq!(TextEntry::decode(&encoded), Some(entry));
    }

    #[test]
    fn embedded_stream_reparses() {
        let png = serialize(&base_chunks());
        let chunks = parse(&png).unwrap();
        let embedded = serialize(&embed_payload(&chunks, "payload").unwrap());
        let reparsed = parse(&embedded).unwrap();
        assert_eq!(extract_payload(&reparsed).unwrap().unwrap().text, "payload");
        assert_eq!(serialize(&strip_payload_chunks(&reparsed)), png);
    }
}
