//! # cardvault-card
//!
//! Character card codec.
//!
//! A character card is a PNG image with a character definition embedded in a
//! `tEXt` chunk. This crate covers everything that is a pure function of the
//! uploaded bytes:
//!
//! - **Chunk codec** ([`chunk`]): lossless PNG chunk parsing and serialization
//! - **Text transcoder** ([`text_chunk`]): extract, strip, and embed the payload chunk
//! - **Document model** ([`document`]): legacy and `chara_card_v2` definitions
//! - **Normalizer** ([`normalize`]): classification, migration, lorebook repair
//! - **Fingerprints** ([`fingerprint`]): original-file and content identity hashes
//!
//! ## Example
//!
//! ```rust
//! use bytes::Bytes;
//! use cardvault_card::chunk::{self, Chunk, ChunkType};
//! use cardvault_card::text_chunk::payload_chunk;
//! use cardvault_card::{fingerprint_content, read_card};
//!
//! let png = chunk::serialize(&[
//!     Chunk::new(ChunkType::IHDR, vec![0u8; 13]),
//!     payload_chunk(r#"{"spec":"chara_card_v2","spec_version":"2.0","data":{"name":"Ada"}}"#),
//!     Chunk::new(ChunkType::IEND, Bytes::new()),
//! ]);
//!
//! let (_clean_image, card) = read_card(&png).unwrap();
//! assert_eq!(card.data.name, "Ada");
//! let fingerprint = fingerprint_content(&card).unwrap();
//! assert_eq!(fingerprint.as_str().len(), 64);
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod card;
pub mod chunk;
pub mod document;
pub mod error;
pub mod fingerprint;
pub mod normalize;
pub mod text_chunk;
pub mod upload;

pub use card::{DecodedCard, decode_card, encode_card, read_card, strip_card};
pub use document::{
    CardData, CharacterBook, CharacterCard, CharacterDocument, EntryPosition, LegacyCard,
    LorebookEntry,
};
pub use error::{CardError, FormatError, PayloadDecodeError, Result, SchemaError};
pub use fingerprint::{
    ContentFingerprint, OriginalFingerprint, fingerprint_content, fingerprint_original,
};
pub use normalize::{DocumentShape, classify, normalize, normalize_value, repair_lorebook_positions};
pub use upload::UploadEnvelope;
