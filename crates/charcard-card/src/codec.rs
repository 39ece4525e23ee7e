//! The character card codec facade.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use charcard_png::{insert_chunk, read_chunks, strip_chunks, text_chunk_data, Chunk, ChunkType};

use crate::avatar::{self, ImageSource};
use crate::de::{to_character, SourceFile};
use crate::extract::{extract_metadata, DecodedPayload, COMPAT_KEY, OWN_KEY};
use crate::model::Character;
use crate::ser::{to_export_payload, wrap_payload};
use crate::{Error, Result};

/// Codec configuration.
#[derive(Debug, Clone)]
pub struct CodecOptions {
    /// Keyword of the text chunk this codec writes and prefers when reading.
    pub own_key: String,
    /// Remove existing metadata chunks from the container before embedding.
    pub strip_existing: bool,
    /// Container used when the avatar cannot be resolved. `None` uses the
    /// built-in grey square.
    pub placeholder: Option<Arc<[u8]>>,
}

impl Default for CodecOptions {
    fn default() -> Self {
        Self {
            own_key: OWN_KEY.to_string(),
            strip_existing: true,
            placeholder: None,
        }
    }
}

/// Embeds characters into PNG avatars and extracts them again.
///
/// Structural PNG errors are returned; metadata and avatar problems are
/// recovered from (blank card, placeholder image) and logged.
///
/// # Example
///
/// ```no_run
/// use charcard_card::{CardCodec, Character, ImageSource};
///
/// let codec = CardCodec::new();
/// let character = Character::new(1, "Aria").description("test");
///
/// let avatar = std::fs::read("aria.png")?;
/// let card = codec.embed(&character, ImageSource::from(avatar))?;
/// std::fs::write("Aria.png", &card)?;
///
/// let restored = codec.extract_file("Aria.png")?;
/// assert_eq!(restored.name, "Aria");
/// # Ok::<(), charcard_card::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct CardCodec {
    options: CodecOptions,
}

impl CardCodec {
    /// Create a codec with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a codec with the given options.
    pub fn with_options(options: CodecOptions) -> Self {
        Self { options }
    }

    /// Use `placeholder` instead of the built-in placeholder image.
    pub fn with_placeholder(mut self, placeholder: impl Into<Arc<[u8]>>) -> Self {
        self.options.placeholder = Some(placeholder.into());
        self
    }

    /// Get the codec options.
    pub fn options(&self) -> &CodecOptions {
        &self.options
    }

    fn keys(&self) -> [&str; 2] {
        [self.options.own_key.as_str(), COMPAT_KEY]
    }

    /// Decode the metadata of a PNG without building a character.
    ///
    /// # Errors
    ///
    /// Returns a format error if `png` is not a PNG.
    pub fn decode_metadata(&self, png: &[u8]) -> Result<Option<DecodedPayload>> {
        let stream = read_chunks(png)?;
        Ok(extract_metadata(&stream, &self.keys()))
    }

    /// Read the character stored in a card.
    ///
    /// A PNG without readable metadata yields a blank character named after
    /// the file.
    ///
    /// # Errors
    ///
    /// Returns a format error if the source is not a PNG.
    pub fn extract(&self, source: &SourceFile) -> Result<Character> {
        let decoded = self.decode_metadata(&source.bytes)?;
        Ok(to_character(decoded, source))
    }

    /// Read the character stored in a card file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read, or a format error if
    /// it is not a PNG.
    pub fn extract_file<P: AsRef<Path>>(&self, path: P) -> Result<Character> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        self.extract(&SourceFile::new(path.to_string_lossy(), bytes))
    }

    /// Serialize the versioned payload for a character.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if serialization fails.
    pub fn payload_json(&self, character: &Character) -> Result<String> {
        let payload = wrap_payload(to_export_payload(character)?);
        Ok(serde_json::to_string(&payload)?)
    }

    /// Embed a character into an avatar image, producing new PNG bytes.
    ///
    /// The avatar comes from `source`, or from `character.image` when `source`
    /// is [`ImageSource::None`]. If it cannot be loaded or is not a PNG, the
    /// placeholder image is used instead.
    ///
    /// # Errors
    ///
    /// Returns a format error if the container has no IEND chunk, and
    /// [`Error::PlaceholderUnavailable`] if the placeholder is needed but cannot
    /// be produced.
    pub fn embed(&self, character: &Character, source: ImageSource) -> Result<Vec<u8>> {
        let container = self.resolve_container(character, source)?;
        let json = self.payload_json(character)?;

        let container = if self.options.strip_existing {
            let (stripped, removed) = strip_chunks(&container, |c| self.is_metadata_chunk(c))?;
            if removed > 0 {
                log::debug!("removed {removed} stale metadata chunk(s) from container");
            }
            stripped
        } else {
            container.to_vec()
        };

        let data = text_chunk_data(&self.options.own_key, &json)?;
        Ok(insert_chunk(&container, ChunkType::TEXT, &data)?)
    }

    /// Embed a character and write the card to `path`.
    ///
    /// # Errors
    ///
    /// As [`CardCodec::embed`], plus [`Error::Io`] if the file cannot be written.
    pub fn embed_to_file<P: AsRef<Path>>(
        &self,
        character: &Character,
        source: ImageSource,
        path: P,
    ) -> Result<()> {
        let card = self.embed(character, source)?;
        fs::write(path, card)?;
        Ok(())
    }

    fn resolve_container(&self, character: &Character, source: ImageSource) -> Result<Arc<[u8]>> {
        let source = match (source, &character.image) {
            (ImageSource::None, Some(image)) => ImageSource::Bytes(Arc::clone(image)),
            (source, _) => source,
        };

        match avatar::resolve(&source) {
            Ok(bytes) => Ok(bytes),
            Err(e) => {
                log::warn!("using placeholder image for {:?}: {}", character.name, e);
                self.placeholder()
            }
        }
    }

    fn placeholder(&self) -> Result<Arc<[u8]>> {
        match &self.options.placeholder {
            Some(bytes) => Ok(Arc::clone(bytes)),
            None => avatar::placeholder_png().map_err(Error::PlaceholderUnavailable),
        }
    }

    fn is_metadata_chunk(&self, chunk: &Chunk<'_>) -> bool {
        chunk.chunk_type.is_text()
            && self.keys().iter().any(|key| {
                chunk.data.len() > key.len()
                    && chunk.data.starts_with(key.as_bytes())
                    && chunk.data[key.len()] == 0
            })
    }
}

/// Read the character stored in a card using default options.
///
/// # Errors
///
/// See [`CardCodec::extract`].
pub fn extract(source: &SourceFile) -> Result<Character> {
    CardCodec::new().extract(source)
}

/// Embed a character into an avatar image using default options.
///
/// # Errors
///
/// See [`CardCodec::embed`].
pub fn embed(character: &Character, source: ImageSource) -> Result<Vec<u8>> {
    CardCodec::new().embed(character, source)
}

#[cfg(test)]
mod tests {
    use charcard_png::{read_chunks, PNG_SIGNATURE};
    use serde_json::json;

    use super::*;
    use crate::extract::PayloadFormat;
    use crate::model::Chat;

    fn placeholder() -> Vec<u8> {
        avatar::placeholder_png().unwrap().to_vec()
    }

    fn card_with_text(key: &str, value: &str) -> Vec<u8> {
        let data = text_chunk_data(key, value).unwrap();
        insert_chunk(&placeholder(), ChunkType::TEXT, &data).unwrap()
    }

    #[test]
    fn test_extract_own_card() {
        let codec = CardCodec::new();
        let character = Character::new(1, "Aria").description("test");
        let card = codec.embed(&character, ImageSource::from(placeholder())).unwrap();

        let mut restored = codec.extract(&SourceFile::new("Aria.png", card)).unwrap();
        restored.clear_transient();
        assert_eq!(restored, character);
    }

    #[test]
    fn test_payload_json() {
        let json = CardCodec::new()
            .payload_json(&Character::new(1, "Aria"))
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(
            value,
            json!({ "version": 1, "character": { "id": 1, "name": "Aria", "chats": [] } })
        );
    }

    #[test]
    fn test_compat_key_with_prefix() {
        let codec = CardCodec::new();
        let a = codec
            .decode_metadata(&card_with_text("chara", r#"chara{"name":"X","chats":[]}"#))
            .unwrap()
            .unwrap();
        let b = codec
            .decode_metadata(&card_with_text("chara", r#"{"name":"X","chats":[]}"#))
            .unwrap()
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(a.key, "chara");
    }

    #[test]
    fn test_own_key_preferred() {
        let chara = card_with_text("chara", r#"{"name":"Compat","avatar":"none"}"#);
        let data = text_chunk_data(OWN_KEY, r#"{"version":1,"character":{"id":3,"name":"Own"}}"#).unwrap();
        let both = insert_chunk(&chara, ChunkType::TEXT, &data).unwrap();

        let decoded = CardCodec::new().decode_metadata(&both).unwrap().unwrap();
        assert_eq!(decoded.key, OWN_KEY);
        assert_eq!(decoded.format, PayloadFormat::OwnWrapped);
    }

    #[test]
    fn test_corrupt_metadata_is_blank_card() {
        let card = card_with_text(OWN_KEY, "{{{ definitely not json");
        let character = CardCodec::new()
            .extract(&SourceFile::new("Broken.png", card))
            .unwrap();
        assert_eq!(character.name, "Broken");
        assert!(character.chats.is_empty());
    }

    #[test]
    fn test_bad_signature_is_fatal() {
        let err = CardCodec::new()
            .extract(&SourceFile::new("x.png", b"GIF89a".to_vec()))
            .unwrap_err();
        assert!(err.is_format_error());
    }

    #[test]
    fn test_embed_falls_back_to_placeholder() {
        let custom = placeholder();
        let codec = CardCodec::new().with_placeholder(custom.clone());
        let character = Character::new(1, "Aria");

        let card = codec
            .embed(&character, ImageSource::from(b"not an image".to_vec()))
            .unwrap();
        let iend = custom.len() - 12;
        assert_eq!(&card[..iend], &custom[..iend]);

        let card = codec.embed(&character, ImageSource::None).unwrap();
        assert_eq!(&card[..iend], &custom[..iend]);
    }

    #[test]
    fn test_embed_prefers_character_image() {
        let mut avatar = PNG_SIGNATURE.to_vec();
        avatar.extend_from_slice(&charcard_png::encode_chunk(ChunkType::IEND, &[]).unwrap());

        let mut character = Character::new(1, "Aria");
        character.image = Some(avatar.clone().into());

        let card = CardCodec::new().embed(&character, ImageSource::None).unwrap();
        assert!(card.starts_with(&avatar[..8]));
        assert_eq!(read_chunks(&card).unwrap().len(), 2);
    }

    #[test]
    fn test_embed_missing_iend_is_fatal() {
        let mut broken = placeholder();
        broken.truncate(broken.len() - 12);

        let err = CardCodec::new()
            .embed(&Character::new(1, "Aria"), ImageSource::from(broken))
            .unwrap_err();
        assert!(matches!(err, Error::Png(charcard_png::Error::MissingIend)));
    }

    #[test]
    fn test_reembed_replaces_metadata() {
        let codec = CardCodec::new();
        let first = Character::new(1, "Aria");
        let second = Character::new(1, "Aria").chat(Chat::new(9));

        let once = codec.embed(&first, ImageSource::from(placeholder())).unwrap();
        let twice = codec.embed(&second, ImageSource::from(once)).unwrap();

        let stream = read_chunks(&twice).unwrap();
        assert_eq!(stream.text_chunks().count(), 1);

        let restored = codec.extract(&SourceFile::new("Aria.png", twice)).unwrap();
        assert_eq!(restored.chats.len(), 1);
    }

    #[test]
    fn test_keep_existing_when_configured() {
        let codec = CardCodec::with_options(CodecOptions {
            strip_existing: false,
            ..CodecOptions::default()
        });

        let once = codec.embed(&Character::new(1, "Old"), ImageSource::from(placeholder())).unwrap();
        let twice = codec.embed(&Character::new(1, "New"), ImageSource::from(once)).unwrap();
        assert_eq!(read_chunks(&twice).unwrap().text_chunks().count(), 2);

        // The most recently inserted chunk is read back
        let restored = codec.extract(&SourceFile::new("card.png", twice)).unwrap();
        assert_eq!(restored.name, "New");
    }

    #[test]
    fn test_legacy_version_not_carried_over() {
        let card = card_with_text(OWN_KEY, r#"{"version":1,"id":5,"name":"L","chats":[]}"#);
        let codec = CardCodec::new();
        let character = codec.extract(&SourceFile::new("L.png", card)).unwrap();
        assert!(character.extra.is_empty());

        let value: serde_json::Value =
            serde_json::from_str(&codec.payload_json(&character).unwrap()).unwrap();
        assert_eq!(
            value,
            json!({ "version": 1, "character": { "id": 5, "name": "L", "chats": [] } })
        );
    }

    #[test]
    fn test_empty_name_round_trip() {
        let codec = CardCodec::new();
        let character = Character::new(1, "");
        let card = codec.embed(&character, ImageSource::from(placeholder())).unwrap();

        let restored = codec.extract(&SourceFile::new("card.png", card)).unwrap();
        assert_eq!(restored.name, "");
    }
}
