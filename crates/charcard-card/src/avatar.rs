//! Resolving the avatar image a card is embedded into.

use std::io::Cursor;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use charcard_png::is_png;
use image::{ImageError, ImageFormat, Rgba, RgbaImage};

use crate::error::ImageResolutionError;

/// Edge length of the generated placeholder avatar.
pub const PLACEHOLDER_SIZE: u32 = 256;

const PLACEHOLDER_COLOR: Rgba<u8> = Rgba([128, 128, 128, 255]);

/// Where the avatar for an embed comes from.
#[derive(Debug, Clone, Default)]
pub enum ImageSource {
    /// No avatar supplied; the character's own `image` is used if present.
    #[default]
    None,
    /// Raw image bytes.
    Bytes(Arc<[u8]>),
    /// An image file on disk.
    File(PathBuf),
    /// A `data:` URL with a base64 payload.
    DataUrl(String),
}

impl From<Vec<u8>> for ImageSource {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes.into())
    }
}

impl From<PathBuf> for ImageSource {
    fn from(path: PathBuf) -> Self {
        Self::File(path)
    }
}

/// Load the bytes behind an image source and check that they are PNG-encoded.
///
/// # Errors
///
/// Any failure is an [`ImageResolutionError`]; callers substitute a placeholder.
pub fn resolve(source: &ImageSource) -> Result<Arc<[u8]>, ImageResolutionError> {
    let bytes: Arc<[u8]> = match source {
        ImageSource::None => return Err(ImageResolutionError::Missing),
        ImageSource::Bytes(bytes) => Arc::clone(bytes),
        ImageSource::File(path) => std::fs::read(path)
            .map_err(|source| ImageResolutionError::Io {
                path: path.clone(),
                source,
            })?
            .into(),
        ImageSource::DataUrl(url) => decode_data_url(url)?.into(),
    };

    if !is_png(&bytes) {
        return Err(ImageResolutionError::NotPng);
    }
    Ok(bytes)
}

/// Decode a base64 `data:` URL into its payload bytes.
pub fn decode_data_url(url: &str) -> Result<Vec<u8>, ImageResolutionError> {
    let rest = url
        .strip_prefix("data:")
        .ok_or(ImageResolutionError::InvalidDataUrl("missing data: scheme"))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or(ImageResolutionError::InvalidDataUrl("missing comma"))?;
    if !meta.ends_with(";base64") {
        return Err(ImageResolutionError::InvalidDataUrl("payload is not base64"));
    }
    Ok(BASE64.decode(payload.trim())?)
}

/// The default placeholder avatar: a neutral grey square PNG.
///
/// Encoded once per process and shared afterwards.
///
/// # Errors
///
/// Returns the encoder's error if the PNG could not be produced.
pub fn placeholder_png() -> Result<Arc<[u8]>, Arc<ImageError>> {
    static PLACEHOLDER: OnceLock<Result<Arc<[u8]>, Arc<ImageError>>> = OnceLock::new();
    PLACEHOLDER
        .get_or_init(|| {
            let img = RgbaImage::from_pixel(PLACEHOLDER_SIZE, PLACEHOLDER_SIZE, PLACEHOLDER_COLOR);
            let mut buf = Vec::new();
            img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
            Ok(buf.into())
        })
        .clone()
}
