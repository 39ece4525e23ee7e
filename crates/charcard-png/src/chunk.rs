//! PNG chunk types and records.

use std::fmt;

use charcard_common::{crc, FromBytes, Immutable, IntoBytes, KnownLayout};
use zerocopy::byteorder::{BigEndian, U32};

/// Size of the length and type fields that precede chunk data.
pub const CHUNK_HEADER_LEN: usize = 8;

/// Size of the CRC trailer that follows chunk data.
pub const CHUNK_CRC_LEN: usize = 4;

/// Bytes a chunk occupies beyond its data.
pub const CHUNK_OVERHEAD: usize = CHUNK_HEADER_LEN + CHUNK_CRC_LEN;

/// Largest data length a chunk may declare.
pub const MAX_CHUNK_LEN: usize = (1 << 31) - 1;

/// Four-character chunk type code.
#[derive(Clone, Copy, PartialEq, Eq, Hash, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(transparent)]
pub struct ChunkType(pub [u8; 4]);

impl ChunkType {
    /// Image header.
    pub const IHDR: Self = Self(*b"IHDR");
    /// Image data.
    pub const IDAT: Self = Self(*b"IDAT");
    /// Image trailer.
    pub const IEND: Self = Self(*b"IEND");
    /// Uncompressed textual data.
    pub const TEXT: Self = Self(*b"tEXt");
    /// Compressed textual data.
    pub const ZTXT: Self = Self(*b"zTXt");
    /// International textual data.
    pub const ITXT: Self = Self(*b"iTXt");

    /// Get the raw type bytes.
    pub const fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }

    /// Returns true for chunks a decoder must understand (uppercase first letter).
    pub const fn is_critical(&self) -> bool {
        self.0[0] & 0x20 == 0
    }

    /// Returns true for any of the three textual chunk types.
    pub fn is_text(&self) -> bool {
        matches!(*self, Self::TEXT | Self::ZTXT | Self::ITXT)
    }
}

impl fmt::Display for ChunkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            let c = if b.is_ascii_graphic() { b as char } else { '.' };
            write!(f, "{c}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for ChunkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChunkType({self})")
    }
}

/// The length and type fields at the start of every chunk.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct ChunkHeader {
    /// Length of the data field.
    pub length: U32<BigEndian>,
    /// Chunk type code.
    pub chunk_type: ChunkType,
}

impl ChunkHeader {
    /// Create a header for `length` bytes of data.
    pub fn new(chunk_type: ChunkType, length: u32) -> Self {
        Self {
            length: U32::new(length),
            chunk_type,
        }
    }
}

/// A chunk located in a PNG byte stream.
///
/// Borrows its data from the buffer it was read from.
#[derive(Debug, Clone, Copy)]
pub struct Chunk<'a> {
    /// Chunk type code.
    pub chunk_type: ChunkType,
    /// Byte offset of the chunk's length field within the stream.
    pub offset: usize,
    /// Chunk data.
    pub data: &'a [u8],
    /// CRC as stored in the stream.
    pub crc: u32,
}

impl<'a> Chunk<'a> {
    /// Total number of bytes the chunk occupies, including length, type and CRC.
    #[inline]
    pub fn total_len(&self) -> usize {
        CHUNK_OVERHEAD + self.data.len()
    }

    /// Byte offset just past the chunk's CRC.
    #[inline]
    pub fn end(&self) -> usize {
        self.offset + self.total_len()
    }

    /// Recompute the CRC and compare it against the stored value.
    pub fn crc_matches(&self) -> bool {
        crc::crc32_chunk(self.chunk_type.as_bytes(), self.data) == self.crc
    }
}
