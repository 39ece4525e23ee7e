//! Chunk stream reading.

use charcard_common::BinaryReader;

use crate::chunk::{Chunk, ChunkHeader, ChunkType, CHUNK_OVERHEAD};
use crate::{Error, Result, PNG_SIGNATURE};

/// The ordered chunks of a PNG byte stream.
#[derive(Debug, Clone)]
pub struct ChunkStream<'a> {
    chunks: Vec<Chunk<'a>>,
    has_iend: bool,
}

impl<'a> ChunkStream<'a> {
    /// Get all chunks in stream order, including IEND when present.
    pub fn chunks(&self) -> &[Chunk<'a>] {
        &self.chunks
    }

    /// Iterate over the chunks in stream order.
    pub fn iter(&self) -> impl Iterator<Item = &Chunk<'a>> {
        self.chunks.iter()
    }

    /// Number of chunks read.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Check if the stream holds no chunks.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Check if the walk ended on an IEND chunk.
    pub fn has_iend(&self) -> bool {
        self.has_iend
    }

    /// Get the IEND chunk, or fail with [`Error::MissingIend`].
    pub fn iend(&self) -> Result<&Chunk<'a>> {
        if !self.has_iend {
            return Err(Error::MissingIend);
        }
        self.chunks.last().ok_or(Error::MissingIend)
    }

    /// Iterate over textual chunks (tEXt, zTXt, iTXt).
    pub fn text_chunks(&self) -> impl Iterator<Item = &Chunk<'a>> {
        self.chunks.iter().filter(|c| c.chunk_type.is_text())
    }
}

/// Check whether a buffer starts with the PNG signature.
pub fn is_png(data: &[u8]) -> bool {
    data.starts_with(&PNG_SIGNATURE)
}

/// Walk a PNG byte stream into its chunks.
///
/// The walk stops after the IEND chunk, or at the end of the buffer. A trailing
/// chunk whose declared length runs past the end of the buffer counts as the
/// end of the buffer. CRCs are not verified.
///
/// # Errors
///
/// Returns [`Error::NotPng`] if the signature does not match. A missing IEND is
/// not an error here; check [`ChunkStream::has_iend`].
pub fn read_chunks(data: &[u8]) -> Result<ChunkStream<'_>> {
    if !is_png(data) {
        return Err(Error::NotPng);
    }

    let mut reader = BinaryReader::new(data);
    reader.advance(PNG_SIGNATURE.len());

    let mut chunks = Vec::new();
    let mut has_iend = false;

    while reader.remaining() >= CHUNK_OVERHEAD {
        let offset = reader.position();
        let header: ChunkHeader = reader.read_struct()?;
        let length = header.length.get() as usize;

        if reader.remaining() < length.saturating_add(4) {
            log::debug!(
                "chunk {} at offset {} declares {} bytes past end of buffer",
                header.chunk_type,
                offset,
                length
            );
            break;
        }

        let chunk_data = reader.read_bytes(length)?;
        let crc = reader.read_u32()?;

        chunks.push(Chunk {
            chunk_type: header.chunk_type,
            offset,
            data: chunk_data,
            crc,
        });

        if header.chunk_type == ChunkType::IEND {
            has_iend = true;
            break;
        }
    }

    Ok(ChunkStream { chunks, has_iend })
}
