//! End-to-end codec tests on encoder-produced PNGs.

use std::io::Cursor;

use charcard_card::{
    embed, extract, CardCodec, Character, Chat, Error, ImageSource, SampleDialogue, SourceFile,
    Sprite, OWN_KEY,
};
use charcard_png::{insert_chunk, read_chunks, text_chunk_data, ChunkType};
use image::{ImageFormat, Rgba, RgbaImage};
use serde_json::json;

fn solid_png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba([220, 180, 40, 255]));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

fn round_trip(character: &Character, img: Vec<u8>) -> Character {
    let card = embed(character, ImageSource::from(img)).unwrap();
    let mut restored = extract(&SourceFile::new("card.png", card)).unwrap();
    restored.clear_transient();
    restored
}

fn rich_character() -> Character {
    let mut character = Character::new(1_718_000_000_000, "Ária 夜")
        .description("Ünïcødé, emoji 🌙 and \"quotes\"\nacross lines")
        .chat(
            Chat::new(1)
                .name("Первый")
                .background("backgrounds/night.png")
                .message(json!({ "role": "user", "content": "こんにちは" }))
                .message(json!({ "role": "character", "content": "Hi!", "edited": true })),
        )
        .chat(Chat::new(2));
    character.sample_dialogues = Some(vec![SampleDialogue {
        user: "Who are you?".to_string(),
        character: "A traveller.".to_string(),
    }]);
    character.default_scenario = Some("A moonlit harbour".to_string());
    character.default_greeting = Some("Welcome back.".to_string());
    character.default_background = Some("backgrounds/harbour.jpg".to_string());
    character.sprites = Some(vec![Sprite {
        emotion: "joy".to_string(),
        filename: "joy.png".to_string(),
    }]);
    character.chats[0].is_active = Some(true);
    character.chats[0].last_activity = Some(json!(1_718_000_123_456_i64));
    character
}

#[test]
fn test_concrete_scenario() {
    let character = Character::new(1, "Aria").description("test");
    let restored = round_trip(&character, solid_png(10, 10));

    assert_eq!(restored, character);
    assert_eq!(
        serde_json::to_value(&restored).unwrap(),
        json!({ "id": 1, "name": "Aria", "description": "test", "chats": [] })
    );
}

#[test]
fn test_round_trip_rich_character() {
    let character = rich_character();
    assert_eq!(round_trip(&character, solid_png(32, 16)), character);
}

#[test]
fn test_round_trip_long_chat_list() {
    let mut character = Character::new(9, "Many");
    for id in 0..500 {
        character.chats.push(
            Chat::new(id).message(json!({ "role": "user", "content": format!("message {id}") })),
        );
    }

    let restored = round_trip(&character, solid_png(10, 10));
    assert_eq!(restored, character);
    let ids: Vec<_> = restored.chats.iter().map(|c| c.id).collect();
    assert_eq!(ids, (0..500).collect::<Vec<_>>());
}

#[test]
fn test_round_trip_group() {
    let mut character = Character::new(3, "Party");
    character.members = Some(vec![json!(1), json!(2)]);
    character.extra.insert("custom".to_string(), json!({ "nested": [1, 2, 3] }));

    let restored = round_trip(&character, solid_png(4, 4));
    assert_eq!(restored, character);
}

#[test]
fn test_transient_fields_are_contextual() {
    let mut character = Character::new(1, "Aria");
    character.original_filename = Some("old-name.png".to_string());

    let card = embed(&character, ImageSource::from(solid_png(10, 10))).unwrap();
    let restored = extract(&SourceFile::new("dir/new-name.png", card.clone())).unwrap();

    assert_eq!(restored.original_filename.as_deref(), Some("new-name.png"));
    assert_eq!(restored.image.as_deref(), Some(&card[..]));
}

#[test]
fn test_inserted_chunk_crc() {
    let card = embed(&rich_character(), ImageSource::from(solid_png(10, 10))).unwrap();
    let stream = read_chunks(&card).unwrap();

    for chunk in stream.iter() {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(chunk.chunk_type.as_bytes());
        hasher.update(chunk.data);
        assert_eq!(chunk.crc, hasher.finalize(), "CRC of {}", chunk.chunk_type);

        let trailer = &card[chunk.end() - 4..chunk.end()];
        assert_eq!(trailer, chunk.crc.to_be_bytes());
    }
}

#[test]
fn test_structural_preservation() {
    let img = solid_png(10, 10);
    let iend = read_chunks(&img).unwrap().iend().unwrap().offset;

    let card = embed(&Character::new(1, "Aria"), ImageSource::from(img.clone())).unwrap();
    let stream = read_chunks(&card).unwrap();
    assert_eq!(stream.len(), read_chunks(&img).unwrap().len() + 1);

    let inserted = stream.text_chunks().next().unwrap();
    assert_eq!(inserted.offset, iend);
    assert_eq!(&card[..iend], &img[..iend]);
    assert_eq!(&card[inserted.end()..], &img[iend..]);
    assert!(inserted.data.starts_with(b"charcard\0"));
}

#[test]
fn test_image_still_decodes() {
    let card = embed(&rich_character(), ImageSource::from(solid_png(10, 10))).unwrap();
    let img = image::load_from_memory(&card).unwrap().to_rgba8();
    assert_eq!(img.dimensions(), (10, 10));
    assert_eq!(img.get_pixel(0, 0), &Rgba([220, 180, 40, 255]));
}

#[test]
fn test_tolerant_compat_parsing() {
    let base = solid_png(4, 4);
    let with = |value: &str| {
        let data = text_chunk_data("chara", value).unwrap();
        insert_chunk(&base, ChunkType::TEXT, &data).unwrap()
    };

    let prefixed = extract(&SourceFile::new("a.png", with(r#"chara{"name":"X","chats":[]}"#))).unwrap();
    let plain = extract(&SourceFile::new("a.png", with(r#"{"name":"X","chats":[]}"#))).unwrap();

    assert_eq!(prefixed.name, "X");
    assert_eq!(prefixed.name, plain.name);
    assert_eq!(prefixed.chats, plain.chats);
    assert_eq!(prefixed.extra, plain.extra);
}

#[test]
fn test_blank_card_synthesis() {
    let character = extract(&SourceFile::new("Aria.png", solid_png(10, 10))).unwrap();

    assert_eq!(character.name, "Aria");
    assert!(character.chats.is_empty());
    assert!(character.id > 0);
    assert!(character.description.is_none());
}

#[test]
fn test_bad_signature_is_fatal() {
    for bytes in [b"".to_vec(), b"hello world".to_vec(), vec![0u8; 64]] {
        let err = extract(&SourceFile::new("x.png", bytes)).unwrap_err();
        assert!(err.is_format_error(), "{err}");
    }
}

#[test]
fn test_reembed_from_pristine_image() {
    let img = solid_png(10, 10);
    let character = Character::new(1, "Aria");

    let first = embed(&character, ImageSource::from(img.clone())).unwrap();
    let second = embed(&character, ImageSource::from(img)).unwrap();
    assert_eq!(first, second);
    assert_eq!(read_chunks(&second).unwrap().text_chunks().count(), 1);

    // Feeding a card back in as the avatar still yields one metadata chunk
    let chained = embed(&character, ImageSource::from(first)).unwrap();
    assert_eq!(read_chunks(&chained).unwrap().text_chunks().count(), 1);
    assert_eq!(chained, second);
}

#[test]
fn test_foreign_text_chunks_survive() {
    let img = solid_png(4, 4);
    let comment = text_chunk_data("Comment", "made with paint").unwrap();
    let img = insert_chunk(&img, ChunkType::TEXT, &comment).unwrap();

    let card = embed(&Character::new(1, "Aria"), ImageSource::from(img)).unwrap();
    let stream = read_chunks(&card).unwrap();
    let texts: Vec<_> = stream.text_chunks().map(|c| c.data).collect();

    assert_eq!(texts.len(), 2);
    assert_eq!(texts[0], &comment[..]);
    assert!(texts[1].starts_with(OWN_KEY.as_bytes()));
}

#[test]
fn test_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let avatar_path = dir.path().join("avatar.png");
    let card_path = dir.path().join("Aria.png");
    std::fs::write(&avatar_path, solid_png(10, 10)).unwrap();

    let codec = CardCodec::new();
    let character = rich_character();
    codec
        .embed_to_file(&character, ImageSource::File(avatar_path), &card_path)
        .unwrap();

    let mut restored = codec.extract_file(&card_path).unwrap();
    assert_eq!(restored.original_filename.as_deref(), Some("Aria.png"));
    restored.clear_transient();
    assert_eq!(restored, character);
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = CardCodec::new()
        .extract_file(dir.path().join("missing.png"))
        .unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}

#[test]
fn test_concurrent_calls_are_independent() {
    let img = solid_png(10, 10);

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let img = img.clone();
                scope.spawn(move || {
                    let character = Character::new(i, format!("Character {i}"));
                    let card = embed(&character, ImageSource::from(img)).unwrap();
                    let mut restored = extract(&SourceFile::new("c.png", card)).unwrap();
                    restored.clear_transient();
                    (character, restored)
                })
            })
            .collect();

        for handle in handles {
            let (character, restored) = handle.join().unwrap();
            assert_eq!(restored, character);
        }
    });
}

mod proptests {
    use charcard_card::{
        embed, extract, placeholder_png, Character, Chat, ImageSource, SampleDialogue, SourceFile,
        Sprite,
    };
    use proptest::prelude::*;
    use serde_json::Value;

    fn arb_text() -> impl Strategy<Value = String> {
        prop_oneof![Just(String::new()), ".{0,24}", "[a-zA-Zà-ÿ一-龥🌙 ]{1,16}"]
    }

    fn arb_background() -> impl Strategy<Value = String> {
        "[a-z0-9_-]{1,12}\\.(png|jpg)".prop_map(|name| format!("backgrounds/{name}"))
    }

    fn arb_message() -> impl Strategy<Value = Value> {
        (arb_text(), arb_text()).prop_map(|(role, content)| {
            serde_json::json!({ "role": role, "content": content })
        })
    }

    fn arb_chat() -> impl Strategy<Value = Chat> {
        (
            any::<i64>(),
            proptest::option::of(arb_text()),
            proptest::option::of(arb_text()),
            proptest::option::of(arb_background()),
            proptest::collection::vec(arb_message(), 0..4),
            proptest::option::of(any::<bool>()),
            proptest::option::of(prop_oneof![
                Just(Value::Null),
                any::<i64>().prop_map(Value::from),
            ]),
        )
            .prop_map(|(id, name, scenario, background, messages, is_active, last_activity)| {
                let mut chat = Chat::new(id);
                chat.name = name;
                chat.scenario = scenario;
                chat.background = background;
                chat.messages = messages;
                chat.is_active = is_active;
                chat.last_activity = last_activity;
                chat
            })
    }

    fn arb_character() -> impl Strategy<Value = Character> {
        let core = (
            any::<i64>(),
            arb_text(),
            proptest::option::of(arb_text()),
            proptest::collection::vec(arb_chat(), 0..5),
        );
        let optional = (
            proptest::option::of(proptest::collection::vec(
                (arb_text(), arb_text()).prop_map(|(user, character)| SampleDialogue { user, character }),
                0..3,
            )),
            proptest::option::of(arb_text()),
            proptest::option::of(arb_text()),
            proptest::option::of(arb_background()),
            proptest::option::of(proptest::collection::vec(
                (arb_text(), arb_text()).prop_map(|(emotion, filename)| Sprite { emotion, filename }),
                0..3,
            )),
            proptest::option::of(proptest::collection::vec(any::<i64>().prop_map(Value::from), 0..4)),
        );

        (core, optional).prop_map(
            |((id, name, description, chats), (dialogues, scenario, greeting, background, sprites, members))| {
                let mut character = Character::new(id, name);
                character.description = description;
                character.chats = chats;
                character.sample_dialogues = dialogues;
                character.default_scenario = scenario;
                character.default_greeting = greeting;
                character.default_background = background;
                character.sprites = sprites;
                character.members = members;
                character
            },
        )
    }

    proptest! {
        #[test]
        fn embed_extract_round_trip(character in arb_character()) {
            let avatar = placeholder_png().unwrap();
            let card = embed(&character, ImageSource::Bytes(avatar)).unwrap();

            let mut restored = extract(&SourceFile::new("card.png", card)).unwrap();
            restored.clear_transient();
            prop_assert_eq!(restored, character);
        }

        #[test]
        fn reembed_is_stable(character in arb_character()) {
            let avatar = placeholder_png().unwrap();
            let once = embed(&character, ImageSource::Bytes(avatar)).unwrap();
            let twice = embed(&character, ImageSource::from(once.clone())).unwrap();
            prop_assert_eq!(once, twice);
        }
    }
}
