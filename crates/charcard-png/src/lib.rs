//! PNG chunk stream handling for character cards.
//!
//! A PNG file is an 8-byte signature followed by a sequence of chunks, ending
//! with an `IEND` chunk. This crate walks that sequence without decoding any
//! pixels, reads and writes textual chunks, and splices new chunks into an
//! existing stream.
//!
//! # Chunk Layout
//!
//! - 4 bytes: Data length (big-endian)
//! - 4 bytes: Type code (ASCII)
//! - N bytes: Data
//! - 4 bytes: CRC32 over type and data (big-endian)
//!
//! # Example
//!
//! ```no_run
//! use charcard_png::{insert_chunk, read_chunks, text_chunk_data, ChunkType};
//!
//! let png = std::fs::read("avatar.png")?;
//!
//! for chunk in read_chunks(&png)?.iter() {
//!     println!("{} at {}: {} bytes", chunk.chunk_type, chunk.offset, chunk.data.len());
//! }
//!
//! let data = text_chunk_data("Comment", "hello")?;
//! let tagged = insert_chunk(&png, ChunkType::TEXT, &data)?;
//! std::fs::write("tagged.png", tagged)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod chunk;
mod error;
mod stream;
pub mod text;
mod writer;

pub use chunk::{
    Chunk, ChunkHeader, ChunkType, CHUNK_CRC_LEN, CHUNK_HEADER_LEN, CHUNK_OVERHEAD, MAX_CHUNK_LEN,
};
pub use error::{Error, Result};
pub use stream::{is_png, read_chunks, ChunkStream};
pub use text::{decode_text, text_chunk_data, TextChunk};
pub use writer::{encode_chunk, insert_chunk, strip_chunks};

/// PNG file signature.
pub const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
