//! Character card codec.
//!
//! A character card is a PNG image that doubles as a complete character
//! record: the pixels are the avatar, and a text chunk holds the character's
//! name, description, chats and other data as JSON.
//!
//! # Payload Format
//!
//! The codec writes one `tEXt` chunk keyed `charcard` whose value is:
//!
//! ```json
//! { "version": 1, "character": { "id": 1, "name": "Aria", "chats": [] } }
//! ```
//!
//! When reading, it also accepts the `chara` key used by other card tools,
//! bare legacy objects, base64-encoded values and values with stray prefixes.
//!
//! # Example
//!
//! ```no_run
//! use charcard_card::{extract, SourceFile};
//!
//! let bytes = std::fs::read("Aria.png")?;
//! let character = extract(&SourceFile::new("Aria.png", bytes))?;
//!
//! for chat in &character.chats {
//!     println!("{}: {} messages", chat.id, chat.messages.len());
//! }
//! # Ok::<(), charcard_card::Error>(())
//! ```

mod avatar;
mod codec;
mod de;
mod error;
pub mod extract;
mod model;
mod paths;
pub mod ser;

pub use avatar::{decode_data_url, placeholder_png, resolve as resolve_image, ImageSource};
pub use codec::{embed, extract, CardCodec, CodecOptions};
pub use de::{now_ms, parse_character_json, to_character, SourceFile};
pub use error::{Error, ImageResolutionError, MetadataError, Result};
pub use extract::{DecodedPayload, PayloadFormat, COMPAT_KEY, OWN_KEY};
pub use model::{Character, Chat, SampleDialogue, Sprite};
pub use ser::{to_export_payload, wrap_payload};
