//! Chunk stream writing.
//!
//! Both operations here copy the input into a fresh buffer. Chunks they do not
//! touch are copied verbatim, stored CRC included.

use charcard_common::{crc, IntoBytes};

use crate::chunk::{Chunk, ChunkHeader, ChunkType, CHUNK_OVERHEAD, MAX_CHUNK_LEN};
use crate::stream::read_chunks;
use crate::{Error, Result, PNG_SIGNATURE};

/// Encode a complete chunk: length, type, data and CRC.
///
/// # Errors
///
/// Returns [`Error::ChunkTooLarge`] if `data` exceeds the PNG chunk length limit.
pub fn encode_chunk(chunk_type: ChunkType, data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(CHUNK_OVERHEAD + data.len());
    write_chunk(&mut out, chunk_type, data)?;
    Ok(out)
}

fn write_chunk(out: &mut Vec<u8>, chunk_type: ChunkType, data: &[u8]) -> Result<()> {
    if data.len() > MAX_CHUNK_LEN {
        return Err(Error::ChunkTooLarge(data.len()));
    }

    let header = ChunkHeader::new(chunk_type, data.len() as u32);
    out.extend_from_slice(header.as_bytes());
    out.extend_from_slice(data);
    out.extend_from_slice(&crc::crc32_chunk(chunk_type.as_bytes(), data).to_be_bytes());
    Ok(())
}

/// Insert a new chunk immediately before the IEND chunk.
///
/// The output is the input with exactly one chunk spliced in: every byte before
/// IEND, and IEND with anything after it, is copied unchanged.
///
/// # Errors
///
/// Returns [`Error::NotPng`] for a bad signature, [`Error::MissingIend`] if the
/// stream has no IEND chunk, and [`Error::ChunkTooLarge`] for oversized data.
pub fn insert_chunk(png: &[u8], chunk_type: ChunkType, data: &[u8]) -> Result<Vec<u8>> {
    let stream = read_chunks(png)?;
    let insertion = stream.iend()?.offset;

    let mut out = Vec::with_capacity(png.len() + CHUNK_OVERHEAD + data.len());
    out.extend_from_slice(&png[..insertion]);
    write_chunk(&mut out, chunk_type, data)?;
    out.extend_from_slice(&png[insertion..]);

    log::debug!(
        "inserted {} chunk of {} bytes at offset {}",
        chunk_type,
        data.len(),
        insertion
    );

    Ok(out)
}

/// Copy a PNG, dropping every chunk for which `remove` returns true.
///
/// IEND is never removed. Returns the new buffer and the number of chunks
/// dropped.
///
/// # Errors
///
/// Returns [`Error::NotPng`] for a bad signature and [`Error::MissingIend`] if
/// the stream has no IEND chunk.
pub fn strip_chunks<F>(png: &[u8], mut remove: F) -> Result<(Vec<u8>, usize)>
where
    F: FnMut(&Chunk<'_>) -> bool,
{
    let stream = read_chunks(png)?;
    let iend = stream.iend()?;

    let mut out = Vec::with_capacity(png.len());
    out.extend_from_slice(&PNG_SIGNATURE);

    let mut removed = 0;
    for chunk in stream.iter() {
        if chunk.chunk_type != ChunkType::IEND && remove(chunk) {
            removed += 1;
            continue;
        }
        if chunk.offset == iend.offset {
            break;
        }
        out.extend_from_slice(&png[chunk.offset..chunk.end()]);
    }
    out.extend_from_slice(&png[iend.offset..]);

    Ok((out, removed))
}
