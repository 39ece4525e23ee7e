//! Metadata extraction from text chunks.
//!
//! Character data has been written into PNGs in several shapes over time, by
//! this codec and by other card tools. Extraction is tolerant in two stages:
//!
//! 1. **Text recovery**: the chunk value is parsed as JSON, then retried with a
//!    redundant key prefix stripped, then with only the outermost `{...}`
//!    region, then after base64-decoding.
//! 2. **Classification**: the parsed object is matched against an ordered
//!    table of known shapes; the first match decides how the character object
//!    is unwrapped.

use std::cmp::Reverse;
use std::sync::OnceLock;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use charcard_png::{decode_text, ChunkStream};
use regex::Regex;
use serde_json::{Map, Value};

use crate::error::MetadataError;

/// Metadata key this codec writes.
pub const OWN_KEY: &str = "charcard";

/// Metadata key shared with other character card tools.
pub const COMPAT_KEY: &str = "chara";

/// The shape a decoded payload was recognized as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadFormat {
    /// `{ "version": 1, "character": { ... } }`, written by this codec.
    OwnWrapped,
    /// A bare character object tagged `"version": 1`.
    LegacyOwn,
    /// `{ "spec": "chara_card_v2", "data": { ... } }` and its v3 successor.
    CompatibilityV2,
    /// A bare card with `name` and `avatar` or `image`.
    Compatibility,
    /// Anything else that parsed as an object.
    Raw,
}

impl PayloadFormat {
    /// Returns true for payloads written by other card tools.
    pub fn is_compatibility(&self) -> bool {
        matches!(self, Self::Compatibility | Self::CompatibilityV2)
    }
}

/// A classified metadata payload.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedPayload {
    /// Key of the text chunk the payload came from.
    pub key: String,
    /// Recognized shape.
    pub format: PayloadFormat,
    /// The character object.
    pub object: Map<String, Value>,
}

struct Classifier {
    format: PayloadFormat,
    matches: fn(&Map<String, Value>) -> bool,
    unwrap: fn(Map<String, Value>) -> Map<String, Value>,
}

/// Shape rules in priority order. An object that matches several rules is
/// claimed by the first.
const CLASSIFIERS: &[Classifier] = &[
    Classifier {
        format: PayloadFormat::OwnWrapped,
        matches: |obj| obj.get("character").is_some_and(Value::is_object),
        unwrap: |mut obj| match obj.remove("character") {
            Some(Value::Object(inner)) => inner,
            _ => Map::new(),
        },
    },
    Classifier {
        format: PayloadFormat::LegacyOwn,
        matches: |obj| obj.get("version").and_then(Value::as_i64) == Some(1),
        unwrap: |mut obj| {
            obj.remove("version");
            obj
        },
    },
    Classifier {
        format: PayloadFormat::CompatibilityV2,
        matches: |obj| {
            matches!(
                obj.get("spec").and_then(Value::as_str),
                Some("chara_card_v2" | "chara_card_v3")
            ) && obj.get("data").is_some_and(Value::is_object)
        },
        unwrap: |mut obj| match obj.remove("data") {
            Some(Value::Object(inner)) => inner,
            _ => Map::new(),
        },
    },
    Classifier {
        format: PayloadFormat::Compatibility,
        matches: |obj| {
            obj.contains_key("name") && (obj.contains_key("avatar") || obj.contains_key("image"))
        },
        unwrap: |obj| obj,
    },
];

/// Classify a parsed payload object and unwrap the character object from it.
pub fn classify(object: Map<String, Value>) -> (PayloadFormat, Map<String, Value>) {
    for classifier in CLASSIFIERS {
        if (classifier.matches)(&object) {
            return (classifier.format, (classifier.unwrap)(object));
        }
    }
    (PayloadFormat::Raw, object)
}

fn brace_region() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\{.*\}").expect("valid regex"))
}

fn parse_object(text: &str) -> Result<Map<String, Value>, MetadataError> {
    match serde_json::from_str(text)? {
        Value::Object(obj) => Ok(obj),
        _ => Err(MetadataError::NotAnObject),
    }
}

fn decode_plain(value: &str, key: &str) -> Result<Map<String, Value>, MetadataError> {
    let direct = parse_object(value);
    if direct.is_ok() {
        return direct;
    }

    if let Some(rest) = value.strip_prefix(key) {
        if let Ok(obj) = parse_object(rest) {
            return Ok(obj);
        }
    }

    if let Some(region) = brace_region().find(value) {
        if let Ok(obj) = parse_object(region.as_str()) {
            return Ok(obj);
        }
    }

    direct
}

/// Tolerantly decode a text chunk value into a JSON object.
///
/// Tries, in order: the value as-is, the value with a leading `key` stripped,
/// the region from the first `{` to the last `}`, and finally the same three
/// steps on the base64-decoded value.
///
/// # Errors
///
/// Returns the error from the direct parse attempt when every step fails.
pub fn decode_object(value: &str, key: &str) -> Result<Map<String, Value>, MetadataError> {
    let plain = decode_plain(value, key);
    if plain.is_ok() {
        return plain;
    }

    let decoded = BASE64
        .decode(value.trim())
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok());
    if let Some(text) = decoded {
        if let Ok(obj) = decode_plain(&text, key) {
            return Ok(obj);
        }
    }

    plain
}

/// Find and decode character metadata in a chunk stream.
///
/// Text chunks are considered when their keyword is one of `keys`; all chunks
/// under the first key are tried before any under the second, and so on. Within
/// a key the last chunk in the stream, which is the most recently inserted, is
/// tried first. The first chunk whose value decodes wins.
///
/// Returns `None` when no chunk carries readable metadata. Decoding failures
/// are logged, never returned.
pub fn extract_metadata(stream: &ChunkStream<'_>, keys: &[&str]) -> Option<DecodedPayload> {
    let mut candidates = Vec::new();
    for (index, chunk) in stream.text_chunks().enumerate() {
        match decode_text(chunk) {
            Ok(text) => {
                if let Some(rank) = keys.iter().position(|k| *k == text.keyword) {
                    candidates.push((rank, Reverse(index), text));
                }
            }
            Err(e) => log::warn!(
                "skipping {} chunk at offset {}: {}",
                chunk.chunk_type,
                chunk.offset,
                MetadataError::from(e)
            ),
        }
    }
    candidates.sort_by_key(|(rank, index, _)| (*rank, *index));

    for (_, _, text) in candidates {
        match decode_object(&text.text, &text.keyword) {
            Ok(object) => {
                let (format, object) = classify(object);
                log::debug!("decoded {:?} payload under key {:?}", format, text.keyword);
                return Some(DecodedPayload {
                    key: text.keyword,
                    format,
                    object,
                });
            }
            Err(e) => log::warn!("unreadable metadata under key {:?}: {}", text.keyword, e),
        }
    }

    None
}
