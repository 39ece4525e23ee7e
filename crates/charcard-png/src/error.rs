//! Error types for PNG chunk handling.

use thiserror::Error;

/// Errors that can occur when reading or writing PNG chunk streams.
#[derive(Debug, Error)]
pub enum Error {
    /// Common library error.
    #[error("{0}")]
    Common(#[from] charcard_common::Error),

    /// The buffer does not start with the PNG signature.
    #[error("not a PNG")]
    NotPng,

    /// The chunk stream ended without an IEND chunk.
    #[error("missing IEND")]
    MissingIend,

    /// Chunk data exceeds the 2^31-1 byte limit PNG places on chunk lengths.
    #[error("chunk data too large: {0} bytes")]
    ChunkTooLarge(usize),

    /// Text chunk is structurally malformed.
    #[error("malformed {chunk_type} chunk: {reason}")]
    MalformedText {
        chunk_type: crate::ChunkType,
        reason: &'static str,
    },

    /// Decompression error.
    #[error("decompression error: {0}")]
    Decompression(String),

    /// Text chunk keyword is empty, too long, or contains a NUL byte.
    #[error("invalid text chunk keyword: {0:?}")]
    InvalidKeyword(String),
}

/// Result type for PNG chunk operations.
pub type Result<T> = std::result::Result<T, Error>;
