//! PNG chunk codec.
//!
//! Splits a PNG byte stream into its ordered chunk list and reassembles it.
//! Only enough structure is validated to locate chunk boundaries: CRCs are
//! carried through untouched and never checked, so `serialize(parse(x)) == x`
//! for every well-formed input. New chunks built with [`Chunk::new`] get a
//! freshly computed CRC.
//!
//! ```text
//! signature (8) | length (4, BE) | type (4) | data (length) | crc (4) | ... | IEND
//! ```

use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;

use crate::error::FormatError;

/// The fixed 8-byte PNG signature.
pub const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Largest data length a chunk may declare.
pub const MAX_CHUNK_LENGTH: u32 = 0x7FFF_FFFF;

/// Length + type + CRC.
const CHUNK_OVERHEAD: usize = 12;

/// A 4-byte chunk type tag.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkType([u8; 4]);

impl ChunkType {
    /// Image header.
    pub const IHDR: Self = Self(*b"IHDR");
    /// Image data.
    pub const IDAT: Self = Self(*b"IDAT");
    /// Terminal chunk.
    pub const IEND: Self = Self(*b"IEND");
    /// Uncompressed Latin-1 text.
    pub const TEXT: Self = Self(*b"tEXt");

    /// Creates a chunk type from raw bytes.
    #[must_use]
    pub const fn new(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }

    /// Returns the raw tag bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }

    /// Ancillary chunks have bit 5 of the first byte set (lowercase first letter).
    #[must_use]
    pub const fn is_ancillary(&self) -> bool {
        self.0[0] & 0x20 != 0
    }
}

impl fmt::Display for ChunkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            if b.is_ascii_graphic() {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "\\x{b:02x}")?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for ChunkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChunkType({self})")
    }
}

/// One length-tagged block of a PNG stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    kind: ChunkType,
    data: Bytes,
    crc: u32,
}

impl Chunk {
    /// Builds a new chunk and computes its CRC over type and data.
    #[must_use]
    pub fn new(kind: ChunkType, data: impl Into<Bytes>) -> Self {
        let data = data.into();
        let crc = compute_crc(kind, &data);
        Self { kind, data, crc }
    }

    /// Returns the chunk type.
    #[must_use]
    pub const fn kind(&self) -> ChunkType {
        self.kind
    }

    /// Returns the chunk data (without length, type and CRC).
    #[must_use]
    pub const fn data(&self) -> &Bytes {
        &self.data
    }

    /// Returns the CRC as stored in the stream.
    #[must_use]
    pub const fn crc(&self) -> u32 {
        self.crc
    }

    /// Returns true if the stored CRC matches the chunk contents.
    #[must_use]
    pub fn crc_matches(&self) -> bool {
        self.crc == compute_crc(self.kind, &self.data)
    }

    /// Returns true for the terminal `IEND` chunk.
    #[must_use]
    pub fn is_end(&self) -> bool {
        self.kind == ChunkType::IEND
    }

    fn encoded_len(&self) -> usize {
        CHUNK_OVERHEAD + self.data.len()
    }
}

fn compute_crc(kind: ChunkType, data: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(kind.as_bytes());
    hasher.update(data);
    hasher.finalize()
}

fn read_u32(buf: &[u8], at: usize) -> u32 {
    u32::from_be_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

/// Splits a PNG stream into its chunks, up to and including `IEND`.
///
/// Chunk data is sliced from `bytes` without copying. Anything after `IEND`
/// is not part of the returned list.
///
/// # Errors
///
/// - [`FormatError::MissingSignature`] if the stream does not start with the PNG signature
/// - [`FormatError::Truncated`] if a chunk's declared length runs past the buffer
/// - [`FormatError::ChunkTooLarge`] if a declared length exceeds the PNG limit
/// - [`FormatError::MissingEnd`] if the stream ends without an `IEND` chunk
pub fn parse(bytes: &Bytes) -> Result<Vec<Chunk>, FormatError> {
    if bytes.len() < PNG_SIGNATURE.len() || bytes[..PNG_SIGNATURE.len()] != PNG_SIGNATURE {
        return Err(FormatError::MissingSignature);
    }

    let mut chunks = Vec::new();
    let mut offset = PNG_SIGNATURE.len();

    while offset < bytes.len() {
        let available = bytes.len() - offset;
        if available < CHUNK_OVERHEAD {
            return Err(FormatError::Truncated {
                offset,
                needed: CHUNK_OVERHEAD,
                available,
            });
        }

        let length = read_u32(bytes, offset);
        if length > MAX_CHUNK_LENGTH {
            return Err(FormatError::ChunkTooLarge { offset, length });
        }
        // Bounded by MAX_CHUNK_LENGTH, fits in usize on every supported target.
        let data_len = length as usize;
        let needed = CHUNK_OVERHEAD + data_len;
        if available < needed {
            return Err(FormatError::Truncated {
                offset,
                needed,
                available,
            });
        }

        let kind = ChunkType::new([
            bytes[offset + 4],
            bytes[offset + 5],
            bytes[offset + 6],
            bytes[offset + 7],
        ]);
        let data_start = offset + 8;
        let data = bytes.slice(data_start..data_start + data_len);
        let crc = read_u32(bytes, data_start + data_len);

        chunks.push(Chunk { kind, data, crc });
        offset += needed;

        if kind == ChunkType::IEND {
            return Ok(chunks);
        }
    }

    Err(FormatError::MissingEnd)
}

/// Reassembles a PNG stream from the signature and `chunks` in order.
#[must_use]
pub fn serialize(chunks: &[Chunk]) -> Bytes {
    let total = PNG_SIGNATURE.len() + chunks.iter().map(Chunk::encoded_len).sum::<usize>();
    let mut out = BytesMut::with_capacity(total);
    out.put_slice(&PNG_SIGNATURE);
    for chunk in chunks {
        // Lengths are bounded by MAX_CHUNK_LENGTH when parsed; constructed
        // chunks above 4 GiB are not representable in PNG anyway.
        #[allow(clippy::cast_possible_truncation)]
        out.put_u32(chunk.data.len() as u32);
        out.put_slice(chunk.kind.as_bytes());
        out.put_slice(&chunk.data);
        out.put_u32(chunk.crc);
    }
    out.freeze()
}

/// Returns the index of the terminal chunk, if present.
#[must_use]
pub fn end_index(chunks: &[Chunk]) -> Option<usize> {
    chunks.iter().rposition(Chunk::is_end)
}
