//! Textual chunk decoding and encoding.
//!
//! PNG carries keyword/value text in three chunk types:
//!
//! - `tEXt`: `keyword \0 text`
//! - `zTXt`: `keyword \0 method text-deflated`
//! - `iTXt`: `keyword \0 flag method language \0 translated-keyword \0 text`
//!
//! `tEXt` is nominally Latin-1, but character card tools routinely store UTF-8
//! JSON in it. Values are therefore decoded as UTF-8 when valid and fall back
//! to Latin-1 otherwise.

use std::io::Read;

use charcard_common::BinaryReader;
use flate2::read::ZlibDecoder;

use crate::chunk::{Chunk, ChunkType};
use crate::{Error, Result};

/// Longest keyword the PNG format allows.
pub const MAX_KEYWORD_LEN: usize = 79;

/// A decoded keyword/value pair from a textual chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    /// The chunk keyword.
    pub keyword: String,
    /// The decoded text value.
    pub text: String,
}

/// Decode a `tEXt`, `zTXt` or `iTXt` chunk into its keyword and text.
///
/// # Errors
///
/// Fails on chunks that are not textual, have no keyword separator, or whose
/// compressed payload cannot be inflated.
pub fn decode_text(chunk: &Chunk<'_>) -> Result<TextChunk> {
    let malformed = |reason: &'static str| Error::MalformedText {
        chunk_type: chunk.chunk_type,
        reason,
    };

    let mut reader = BinaryReader::new(chunk.data);
    let keyword = reader
        .read_cstring_bytes()
        .map_err(|_| malformed("missing keyword separator"))?;
    let keyword = latin1_to_string(keyword);

    let text = match chunk.chunk_type {
        ChunkType::TEXT => bytes_to_string(reader.remaining_bytes()),
        ChunkType::ZTXT => {
            let method = reader.read_u8().map_err(|_| malformed("missing compression method"))?;
            if method != 0 {
                return Err(malformed("unknown compression method"));
            }
            bytes_to_string(&inflate(reader.remaining_bytes())?)
        }
        ChunkType::ITXT => {
            let compressed = reader.read_u8().map_err(|_| malformed("missing compression flag"))?;
            let method = reader.read_u8().map_err(|_| malformed("missing compression method"))?;
            reader
                .read_cstring_bytes()
                .map_err(|_| malformed("missing language tag"))?;
            reader
                .read_cstring_bytes()
                .map_err(|_| malformed("missing translated keyword"))?;

            match (compressed, method) {
                (0, _) => bytes_to_string(reader.remaining_bytes()),
                (1, 0) => bytes_to_string(&inflate(reader.remaining_bytes())?),
                _ => return Err(malformed("unknown compression method")),
            }
        }
        _ => return Err(malformed("not a textual chunk")),
    };

    Ok(TextChunk { keyword, text })
}

/// Build the data of a `tEXt` chunk: `keyword \0 text`.
///
/// The text is written as UTF-8 bytes without transcoding.
///
/// # Errors
///
/// Returns [`Error::InvalidKeyword`] for keywords that are empty, longer than
/// 79 bytes, or contain a NUL byte.
pub fn text_chunk_data(keyword: &str, text: &str) -> Result<Vec<u8>> {
    validate_keyword(keyword)?;

    let mut data = Vec::with_capacity(keyword.len() + 1 + text.len());
    data.extend_from_slice(keyword.as_bytes());
    data.push(0);
    data.extend_from_slice(text.as_bytes());
    Ok(data)
}

fn validate_keyword(keyword: &str) -> Result<()> {
    if keyword.is_empty() || keyword.len() > MAX_KEYWORD_LEN || keyword.contains('\0') {
        return Err(Error::InvalidKeyword(keyword.to_string()));
    }
    Ok(())
}

fn inflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut decompressed = Vec::new();
    ZlibDecoder::new(data)
        .read_to_end(&mut decompressed)
        .map_err(|e| Error::Decompression(e.to_string()))?;
    Ok(decompressed)
}

fn bytes_to_string(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => latin1_to_string(bytes),
    }
}

fn latin1_to_string(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}
