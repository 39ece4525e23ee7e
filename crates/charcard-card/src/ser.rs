//! Building the export payload embedded into a card.

use serde_json::{json, Value};

use crate::model::Character;
use crate::paths;
use crate::Result;

/// Schema version tagged onto every payload this codec writes.
pub const PAYLOAD_VERSION: u32 = 1;

/// Directory prefix every background reference is rewritten under.
pub const BACKGROUNDS_DIR: &str = "backgrounds/";

/// Normalize a character into the JSON object that gets embedded.
///
/// Works on a copy; `character` is left untouched. The transient `image` and
/// `original_filename` fields are dropped and every background reference is
/// rewritten to `backgrounds/<file name>`.
///
/// # Errors
///
/// Returns [`crate::Error::Json`] if the character cannot be serialized.
pub fn to_export_payload(character: &Character) -> Result<Value> {
    let mut export = character.clone();
    export.clear_transient();

    if let Some(background) = export.default_background.as_mut() {
        normalize_background(background);
    }
    for chat in &mut export.chats {
        if let Some(background) = chat.background.as_mut() {
            normalize_background(background);
        }
    }

    Ok(serde_json::to_value(&export)?)
}

/// Wrap an export payload in the versioned envelope.
pub fn wrap_payload(payload: Value) -> Value {
    json!({
        "version": PAYLOAD_VERSION,
        "character": payload,
    })
}

/// Rewrite a background reference to `backgrounds/<last segment>`.
///
/// References already of that form, and empty references, are left alone.
pub fn normalize_background(reference: &mut String) {
    if is_normalized(reference) {
        return;
    }

    let segment = paths::last_segment(reference);
    if segment.is_empty() {
        return;
    }
    *reference = format!("{BACKGROUNDS_DIR}{segment}");
}

fn is_normalized(reference: &str) -> bool {
    match reference.strip_prefix(BACKGROUNDS_DIR) {
        Some(name) => !name.is_empty() && !name.contains(['/', '\\']),
        None => reference.is_empty(),
    }
}
