//! Mapping decoded payloads onto [`Character`] records.

use std::collections::HashSet;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::extract::{classify, decode_object, DecodedPayload, OWN_KEY};
use crate::model::{Character, Chat};
use crate::paths;
use crate::Result;

/// A PNG file handed to the codec: its name and its bytes.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// File name, possibly with a directory prefix.
    pub name: String,
    /// Raw file contents.
    pub bytes: Arc<[u8]>,
}

impl SourceFile {
    /// Create a source file from a name and its contents.
    pub fn new(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// File name without directories.
    pub fn file_name(&self) -> &str {
        paths::last_segment(&self.name)
    }

    /// File name without directories or extension.
    pub fn stem(&self) -> &str {
        paths::file_stem(&self.name)
    }
}

/// Current time in milliseconds since the Unix epoch, used for fresh ids.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Build a [`Character`] from decoded metadata, or a blank card when there is none.
///
/// Missing ids are generated, missing chat lists and message lists default to
/// empty, and fields of the wrong type are dropped individually. The returned
/// character's `image` always refers to `source`'s bytes and its
/// `original_filename` to `source`'s name, whatever the metadata says.
pub fn to_character(decoded: Option<DecodedPayload>, source: &SourceFile) -> Character {
    let mut character = match decoded {
        Some(payload) => from_payload(payload, source),
        None => {
            log::debug!("no metadata in {}, synthesizing blank card", source.name);
            Character::new(now_ms(), source.stem())
        }
    };

    character.image = Some(Arc::clone(&source.bytes));
    character.original_filename = Some(source.file_name().to_string());
    character
}

/// Parse a standalone character JSON document, such as an exported payload.
///
/// Accepts every shape extraction accepts, wrapped or bare. `name` is used for
/// the fallback character name and as `original_filename`; `image` is left
/// empty.
///
/// # Errors
///
/// Returns [`crate::Error::Metadata`] if the text is not a JSON object.
pub fn parse_character_json(text: &str, name: &str) -> Result<Character> {
    let (format, object) = classify(decode_object(text, OWN_KEY)?);
    let source = SourceFile::new(name, Vec::new());
    let payload = DecodedPayload {
        key: OWN_KEY.to_string(),
        format,
        object,
    };

    let mut character = to_character(Some(payload), &source);
    character.image = None;
    Ok(character)
}

fn from_payload(payload: DecodedPayload, source: &SourceFile) -> Character {
    let DecodedPayload {
        format,
        object: mut obj,
        ..
    } = payload;

    // Transient fields never come from metadata
    obj.remove("image");
    obj.remove("originalFilename");

    let id = take_id(&mut obj, "id").unwrap_or_else(now_ms);
    let name = take_field::<String>(&mut obj, "name")
        .unwrap_or_else(|| source.stem().to_string());

    let mut character = Character::new(id, name);
    character.description = take_field(&mut obj, "description");
    character.sample_dialogues = take_field(&mut obj, "sampleDialogues");
    character.default_scenario = take_field(&mut obj, "defaultScenario");
    character.default_greeting = take_field(&mut obj, "defaultGreeting");
    character.default_background = take_field(&mut obj, "defaultBackground");
    character.sprites = take_field(&mut obj, "sprites");
    character.members = take_field(&mut obj, "members");

    character.chats = match obj.remove("chats") {
        Some(Value::Array(items)) => to_chats(items),
        Some(Value::Null) | None => Vec::new(),
        Some(other) => {
            log::warn!("ignoring non-array chats field: {}", type_name(&other));
            Vec::new()
        }
    };

    if format.is_compatibility() {
        if character.default_greeting.is_none() {
            character.default_greeting = peek_string(&obj, "first_mes");
        }
        if character.default_scenario.is_none() {
            character.default_scenario = peek_string(&obj, "scenario");
        }
    }

    character.extra = obj;
    character
}

fn to_chats(items: Vec<Value>) -> Vec<Chat> {
    let mut used: HashSet<i64> = items
        .iter()
        .filter_map(|item| item.get("id").and_then(id_from_value))
        .collect();
    let mut next_id = now_ms();

    let mut chats = Vec::with_capacity(items.len());
    for item in items {
        let mut obj = match item {
            Value::Object(obj) => obj,
            other => {
                log::warn!("dropping chat entry that is not an object: {}", type_name(&other));
                continue;
            }
        };

        let id = match take_id(&mut obj, "id") {
            Some(id) => id,
            None => {
                while used.contains(&next_id) {
                    next_id += 1;
                }
                used.insert(next_id);
                next_id
            }
        };

        let mut chat = Chat::new(id);
        chat.name = take_field(&mut obj, "name");
        chat.scenario = take_field(&mut obj, "scenario");
        chat.background = take_field(&mut obj, "background");
        chat.messages = take_field(&mut obj, "messages").unwrap_or_default();
        chat.is_active = take_field(&mut obj, "isActive");
        chat.last_activity = obj.remove("lastActivity");
        chat.extra = obj;
        chats.push(chat);
    }
    chats
}

/// Remove `key` and deserialize it. Null, missing and mistyped values yield `None`.
fn take_field<T: DeserializeOwned>(obj: &mut Map<String, Value>, key: &str) -> Option<T> {
    match obj.remove(key)? {
        Value::Null => None,
        value => match serde_json::from_value(value) {
            Ok(v) => Some(v),
            Err(e) => {
                log::warn!("dropping field {key:?}: {e}");
                None
            }
        },
    }
}

fn take_id(obj: &mut Map<String, Value>, key: &str) -> Option<i64> {
    let value = obj.remove(key)?;
    let id = id_from_value(&value);
    if id.is_none() && !value.is_null() {
        log::warn!("replacing unusable {key:?} value {value}");
    }
    id
}

/// Integers, integral floats and numeric strings are accepted as ids.
fn id_from_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && f.abs() < 9.0e15).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn peek_string(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
