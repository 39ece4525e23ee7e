//! charcard - PNG character card library.
//!
//! This crate provides a unified interface to the charcard library ecosystem
//! for reading and writing character cards: PNG avatars that carry a full
//! character record in a text chunk.
//!
//! # Crates
//!
//! - [`charcard_common`] - Common utilities (binary reading, CRC32)
//! - [`charcard_png`] - PNG chunk stream reading, text chunks, chunk insertion
//! - [`charcard_card`] - Character model and the card codec
//!
//! # Example
//!
//! ```no_run
//! use charcard::prelude::*;
//!
//! let codec = CardCodec::new();
//!
//! // Open a card and add a chat
//! let mut character = codec.extract_file("Aria.png")?;
//! character.chats.push(Chat::new(now_ms()).name("New chat"));
//!
//! // Save it back into the same avatar
//! let card = codec.embed(&character, ImageSource::None)?;
//! std::fs::write("Aria.png", card)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

// Re-export all sub-crates
pub use charcard_card as card;
pub use charcard_common as common;
pub use charcard_png as png;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use charcard_card::{
        now_ms, CardCodec, Character, Chat, CodecOptions, DecodedPayload, ImageSource,
        PayloadFormat, SourceFile,
    };
    pub use charcard_common::{crc, BinaryReader};
    pub use charcard_png::{read_chunks, ChunkType};
}

// Re-export commonly used types at the crate root
pub use charcard_card::{embed, extract, CardCodec};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
