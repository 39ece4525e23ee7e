//! Error types for the character card codec.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

/// Errors the codec surfaces to its callers.
///
/// Metadata and avatar problems never show up here; the codec recovers from
/// those with a blank card or a placeholder image.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from reading or writing a caller-supplied path.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Structural PNG error (bad signature, missing IEND).
    #[error("{0}")]
    Png(#[from] charcard_png::Error),

    /// Payload serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A standalone character document could not be decoded.
    #[error("invalid character document: {0}")]
    Metadata(#[from] MetadataError),

    /// The placeholder image could not be produced.
    #[error("placeholder image unavailable")]
    PlaceholderUnavailable(#[source] Arc<image::ImageError>),
}

impl Error {
    /// Returns true for structural container errors the codec refuses to guess past.
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            Error::Png(charcard_png::Error::NotPng | charcard_png::Error::MissingIend)
        )
    }
}

/// Result type for codec operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Why a text chunk's payload could not be turned into a JSON object.
///
/// Only ever logged; extraction treats it like absent metadata.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// The chunk itself could not be decoded.
    #[error("unreadable text chunk: {0}")]
    Chunk(#[from] charcard_png::Error),

    /// No candidate text parsed as JSON.
    #[error("payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The payload parsed but is not a JSON object.
    #[error("payload JSON is not an object")]
    NotAnObject,
}

/// Why the supplied avatar could not be used as the embedding container.
///
/// Recovered by substituting the placeholder image.
#[derive(Debug, Error)]
pub enum ImageResolutionError {
    /// No avatar was supplied.
    #[error("no avatar image supplied")]
    Missing,

    /// The avatar file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The data URL is malformed or not base64-encoded.
    #[error("invalid data URL: {0}")]
    InvalidDataUrl(&'static str),

    /// The data URL payload is not valid base64.
    #[error("invalid base64 in data URL: {0}")]
    Base64(#[from] base64::DecodeError),

    /// The avatar bytes are not PNG-encoded.
    #[error("avatar is not PNG-encoded")]
    NotPng,
}
