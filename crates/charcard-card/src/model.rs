//! Canonical in-memory character records.
//!
//! Serialization uses the camelCase field names of the embedded payload.
//! Fields this crate does not model are kept in `extra` so that data written by
//! other tools survives a round trip.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A chat character.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Character {
    /// Stable identity.
    pub id: i64,
    /// Display name.
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Chats in list order.
    pub chats: Vec<Chat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_dialogues: Option<Vec<SampleDialogue>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_scenario: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_greeting: Option<String>,
    /// Path reference such as `backgrounds/forest.png`, never image data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_background: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sprites: Option<Vec<Sprite>>,
    /// Group membership, kept opaque.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub members: Option<Vec<Value>>,
    /// Fields not modelled above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,

    /// The avatar PNG this character was read from. Never serialized.
    #[serde(skip)]
    pub image: Option<Arc<[u8]>>,
    /// Name of the file this character was read from. Never serialized.
    #[serde(skip)]
    pub original_filename: Option<String>,
}

impl Character {
    /// Create a character with no chats and no optional fields.
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            description: None,
            chats: Vec::new(),
            sample_dialogues: None,
            default_scenario: None,
            default_greeting: None,
            default_background: None,
            sprites: None,
            members: None,
            extra: Map::new(),
            image: None,
            original_filename: None,
        }
    }

    /// Set the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Append a chat.
    pub fn chat(mut self, chat: Chat) -> Self {
        self.chats.push(chat);
        self
    }

    /// Drop the transient `image` and `original_filename` fields.
    pub fn clear_transient(&mut self) {
        self.image = None;
        self.original_filename = None;
    }
}

/// A chat session with a character.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    pub id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scenario: Option<String>,
    /// Path reference such as `backgrounds/forest.png`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    /// Messages, uninterpreted.
    pub messages: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    /// Kept as written, explicit `null` included.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_activity: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Chat {
    /// Create an empty chat.
    pub fn new(id: i64) -> Self {
        Self {
            id,
            name: None,
            scenario: None,
            background: None,
            messages: Vec::new(),
            is_active: None,
            last_activity: None,
            extra: Map::new(),
        }
    }

    /// Set the chat name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the background path.
    pub fn background(mut self, background: impl Into<String>) -> Self {
        self.background = Some(background.into());
        self
    }

    /// Append a message.
    pub fn message(mut self, message: Value) -> Self {
        self.messages.push(message);
        self
    }
}

/// An example exchange used to prime the character's voice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleDialogue {
    pub user: String,
    pub character: String,
}

/// An emotion-specific sprite image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sprite {
    pub emotion: String,
    pub filename: String,
}
