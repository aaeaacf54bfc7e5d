//! Character definition document model.
//!
//! Two generations of the definition JSON exist in the wild:
//!
//! - **Legacy**: six flat string fields, no version marker.
//! - **Current** (`chara_card_v2`): a versioned envelope whose `data` object
//!   is a superset of the legacy fields, optionally with an embedded lorebook.
//!
//! [`CharacterDocument`] is the tagged union of both; everything downstream of
//! normalization works with [`CharacterCard`] only. Keys this model does not
//! name are preserved verbatim through the `extra` maps, so re-serializing a
//! card never drops data a producer put there.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Envelope marker of the current generation.
pub const SPEC_V2: &str = "chara_card_v2";

/// Version string written when migrating legacy documents.
pub const SPEC_VERSION_V2: &str = "2.0";

/// Field names every legacy document carries.
pub const LEGACY_FIELDS: [&str; 6] = [
    "name",
    "description",
    "personality",
    "scenario",
    "first_mes",
    "mes_example",
];

/// Reads `null` (or an absent key, together with `#[serde(default)]`) as the default value.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Renders any JSON value as text: `null` is empty, strings are taken as-is,
/// everything else becomes its compact JSON form.
fn value_to_text(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    }
}

/// Reads a text field from whatever JSON value a producer put there.
fn loose_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(value_to_text)
}

/// Reads a list of strings; a lone value becomes a one-element list.
fn loose_string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => Vec::new(),
        Value::Array(items) => items.into_iter().map(value_to_text).collect(),
        other => vec![value_to_text(other)],
    })
}

/// Reads the extensions value; `null` becomes an empty object.
fn extensions_value<'de, D>(deserializer: D) -> Result<Value, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => empty_object(),
        other => other,
    })
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

/// A current-generation (`chara_card_v2`) definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterCard {
    /// Always [`SPEC_V2`] after normalization.
    pub spec: String,
    /// Version of the envelope, e.g. `2.0`.
    #[serde(deserialize_with = "loose_string")]
    pub spec_version: String,
    /// The character payload.
    pub data: CardData,
    /// Top-level keys other than the envelope fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The `data` object of a current-generation card.
///
/// Text fields accept any JSON value and keep non-strings as their JSON text;
/// list fields accept a lone value as a one-element list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardData {
    /// Display name.
    #[serde(default, deserialize_with = "loose_string")]
    pub name: String,
    /// Character description.
    #[serde(default, deserialize_with = "loose_string")]
    pub description: String,
    /// Personality summary.
    #[serde(default, deserialize_with = "loose_string")]
    pub personality: String,
    /// Scenario text.
    #[serde(default, deserialize_with = "loose_string")]
    pub scenario: String,
    /// Opening message.
    #[serde(default, deserialize_with = "loose_string")]
    pub first_mes: String,
    /// Example dialogue.
    #[serde(default, deserialize_with = "loose_string")]
    pub mes_example: String,
    /// Notes from the creator.
    #[serde(default, deserialize_with = "loose_string")]
    pub creator_notes: String,
    /// System prompt override.
    #[serde(default, deserialize_with = "loose_string")]
    pub system_prompt: String,
    /// Post-history instructions.
    #[serde(default, deserialize_with = "loose_string")]
    pub post_history_instructions: String,
    /// Alternative opening messages.
    #[serde(default, deserialize_with = "loose_string_list")]
    pub alternate_greetings: Vec<String>,
    /// Embedded lorebook.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character_book: Option<CharacterBook>,
    /// Free-form tags.
    #[serde(default, deserialize_with = "loose_string_list")]
    pub tags: Vec<String>,
    /// Creator name.
    #[serde(default, deserialize_with = "loose_string")]
    pub creator: String,
    /// Creator-assigned version.
    #[serde(default, deserialize_with = "loose_string")]
    pub character_version: String,
    /// Application-specific extensions, normally an object.
    #[serde(default = "empty_object", deserialize_with = "extensions_value")]
    pub extensions: Value,
    /// Keys not named above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for CardData {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            personality: String::new(),
            scenario: String::new(),
            first_mes: String::new(),
            mes_example: String::new(),
            creator_notes: String::new(),
            system_prompt: String::new(),
            post_history_instructions: String::new(),
            alternate_greetings: Vec::new(),
            character_book: None,
            tags: Vec::new(),
            creator: String::new(),
            character_version: String::new(),
            extensions: empty_object(),
            extra: Map::new(),
        }
    }
}

/// A lorebook embedded in a card.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CharacterBook {
    /// Lorebook entries.
    #[serde(default, deserialize_with = "null_as_default")]
    pub entries: Vec<LorebookEntry>,
    /// Remaining lorebook fields (name, scan depth, budget, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One lorebook entry. Only `position` is interpreted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LorebookEntry {
    /// Where the entry is inserted relative to the character definition.
    #[serde(default)]
    pub position: EntryPosition,
    /// Remaining entry fields (keys, content, order, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Insertion position of a lorebook entry.
///
/// Historical documents encode the position as a number (`0` for "before").
/// Such values deserialize as [`EntryPosition::Unrepaired`] and are rewritten
/// by [`crate::normalize::repair_lorebook_positions`].
#[derive(Debug, Clone, PartialEq)]
pub enum EntryPosition {
    /// Inserted before the character definition.
    BeforeChar,
    /// Inserted after the character definition.
    AfterChar,
    /// Any value other than the two enum strings, including a missing key.
    Unrepaired(Value),
}

impl Default for EntryPosition {
    fn default() -> Self {
        Self::Unrepaired(Value::Null)
    }
}

impl EntryPosition {
    /// Wire name of [`EntryPosition::BeforeChar`].
    pub const BEFORE_CHAR: &'static str = "before_char";
    /// Wire name of [`EntryPosition::AfterChar`].
    pub const AFTER_CHAR: &'static str = "after_char";

    /// Interprets a raw JSON value.
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        match value.as_str() {
            Some(Self::BEFORE_CHAR) => Self::BeforeChar,
            Some(Self::AFTER_CHAR) => Self::AfterChar,
            _ => Self::Unrepaired(value),
        }
    }

    /// Returns the enum form: legacy `0` means before, anything else after.
    #[must_use]
    pub fn repaired(&self) -> Self {
        match self {
            Self::BeforeChar => Self::BeforeChar,
            Self::AfterChar => Self::AfterChar,
            #[allow(clippy::float_cmp)]
            Self::Unrepaired(v) if v.as_f64() == Some(0.0) => Self::BeforeChar,
            Self::Unrepaired(_) => Self::AfterChar,
        }
    }

    /// Returns true if the value is one of the two enum strings.
    #[must_use]
    pub const fn is_repaired(&self) -> bool {
        !matches!(self, Self::Unrepaired(_))
    }
}

impl Serialize for EntryPosition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::BeforeChar => serializer.serialize_str(Self::BEFORE_CHAR),
            Self::AfterChar => serializer.serialize_str(Self::AFTER_CHAR),
            Self::Unrepaired(v) => v.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for EntryPosition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Self::from_value)
    }
}

/// A legacy (pre-envelope) definition.
///
/// Keys beyond the six flat fields are not retained. Non-string values are
/// kept as their JSON text, so every legacy-shaped object converts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyCard {
    /// Display name.
    #[serde(deserialize_with = "loose_string")]
    pub name: String,
    /// Character description.
    #[serde(deserialize_with = "loose_string")]
    pub description: String,
    /// Personality summary.
    #[serde(deserialize_with = "loose_string")]
    pub personality: String,
    /// Scenario text.
    #[serde(deserialize_with = "loose_string")]
    pub scenario: String,
    /// Opening message.
    #[serde(deserialize_with = "loose_string")]
    pub first_mes: String,
    /// Example dialogue.
    #[serde(deserialize_with = "loose_string")]
    pub mes_example: String,
}

/// A definition of either generation, resolved once by classification.
#[derive(Debug, Clone, PartialEq)]
pub enum CharacterDocument {
    /// Flat legacy document.
    Legacy(LegacyCard),
    /// Versioned `chara_card_v2` document.
    Current(CharacterCard),
}

impl CharacterDocument {
    /// Converts to the current generation, migrating legacy documents.
    #[must_use]
    pub fn into_current(self) -> CharacterCard {
        match self {
            Self::Current(card) => card,
            Self::Legacy(legacy) => CharacterCard::from(legacy),
        }
    }
}

impl From<LegacyCard> for CharacterCard {
    fn from(legacy: LegacyCard) -> Self {
        Self {
            spec: SPEC_V2.to_string(),
            spec_version: SPEC_VERSION_V2.to_string(),
            data: CardData {
                name: legacy.name,
                description: legacy.description,
                personality: legacy.personality,
                scenario: legacy.scenario,
                first_mes: legacy.first_mes,
                mes_example: legacy.mes_example,
                ..CardData::default()
            },
            extra: Map::new(),
        }
    }
}

impl CharacterCard {
    /// Lorebook entries, empty when the card has no lorebook.
    #[must_use]
    pub fn lorebook_entries(&self) -> &[LorebookEntry] {
        self.data
            .character_book
            .as_ref()
            .map_or(&[], |book| book.entries.as_slice())
    }

    /// Text whose tokens are always in context: description, personality, scenario.
    #[must_use]
    pub fn permanent_text(&self) -> String {
        [
            self.data.description.as_str(),
            self.data.personality.as_str(),
            self.data.scenario.as_str(),
        ]
        .concat()
    }

    /// Permanent text followed by the first message.
    #[must_use]
    pub fn total_text(&self) -> String {
        let mut text = self.permanent_text();
        text.push_str(&self.data.first_mes);
        text
    }

    /// Description, personality and scenario joined by newlines, blanks skipped.
    #[must_use]
    pub fn summary_text(&self) -> String {
        [
            self.data.description.as_str(),
            self.data.personality.as_str(),
            self.data.scenario.as_str(),
        ]
        .into_iter()
        .filter(|s| !s.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_keys_survive_roundtrip() {
        let raw = json!({
            "spec": "chara_card_v2",
            "spec_version": "2.0",
            "data": {
                "name": "Mira",
                "avatar_style": "pixel",
                "character_book": {
                    "name": "Mira lore",
                    "entries": [{"keys": ["harbor"], "content": "c", "position": "after_char", "priority": 3}]
                }
            },
            "producer": "tool-x"
        });
        let card: CharacterCard = serde_json::from_value(raw).unwrap();
        assert_eq!(card.data.extra.get("avatar_style"), Some(&json!("pixel")));

        let back = serde_json::to_value(&card).unwrap();
        assert_eq!(back["data"]["avatar_style"], json!("pixel"));
        assert_eq!(back["producer"], json!("tool-x"));
        assert_eq!(back["data"]["character_book"]["name"], json!("Mira lore"));
        assert_eq!(
            back["data"]["character_book"]["entries"][0]["priority"],
            json!(3)
        );
    }

    #[test]
    fn nulls_read_as_empty() {
        let raw = json!({
            "spec": "chara_card_v2",
            "spec_version": 2,
            "data": {"name": "N", "creator_notes": null, "tags": null, "extensions": null}
        });
        let card: CharacterCard = serde_json::from_value(raw).unwrap();
        assert_eq!(card.spec_version, "2");
        assert_eq!(card.data.creator_notes, "");
        assert!(card.data.tags.is_empty());
        assert_eq!(card.data.extensions, json!({}));
    }

    #[test]
    fn entry_position_parsing() {
        assert_eq!(
            EntryPosition::from_value(json!("before_char")),
            EntryPosition::BeforeChar
        );
        assert_eq!(
            EntryPosition::from_value(json!(0)),
            EntryPosition::Unrepaired(json!(0))
        );
        assert_eq!(EntryPosition::from_value(json!(0)).repaired(), EntryPosition::BeforeChar);
        assert_eq!(EntryPosition::from_value(json!(1)).repaired(), EntryPosition::AfterChar);
        assert_eq!(EntryPosition::from_value(json!("0")).repaired(), EntryPosition::AfterChar);
        assert_eq!(EntryPosition::default().repaired(), EntryPosition::AfterChar);
    }

    #[test]
    fn unrepaired_position_serializes_raw() {
        let entry = LorebookEntry {
            position: EntryPosition::Unrepaired(json!(4)),
            extra: Map::new(),
        };
        assert_eq!(serde_json::to_value(&entry).unwrap(), json!({"position": 4}));
    }

    #[test]
    fn legacy_converts_with_empty_optionals() {
        let legacy = LegacyCard {
            name: "A".into(),
            description: "d".into(),
            personality: "p".into(),
            scenario: "s".into(),
            first_mes: "f".into(),
            mes_example: "m".into(),
        };
        let card = CharacterCard::from(legacy);
        let value = serde_json::to_value(&card).unwrap();
        assert_eq!(value["spec"], json!("chara_card_v2"));
        assert_eq!(value["spec_version"], json!("2.0"));
        assert_eq!(value["data"]["creator_notes"], json!(""));
        assert_eq!(value["data"]["alternate_greetings"], json!([]));
        assert_eq!(value["data"]["extensions"], json!({}));
        assert!(value["data"].get("character_book").is_none());
    }

    #[test]
    fn text_helpers() {
        let mut card = CharacterCard::from(LegacyCard {
            name: "A".into(),
            description: "desc".into(),
            personality: "  ".into(),
            scenario: "scene".into(),
            first_mes: "hi".into(),
            mes_example: String::new(),
        });
        assert_eq!(card.permanent_text(), "desc  scene");
        assert_eq!(card.total_text(), "desc  scenehi");
        assert_eq!(card.summary_text(), "desc\nscene");
        assert!(card.lorebook_entries().is_empty());

        card.data.character_book = Some(CharacterBook {
            entries: vec![LorebookEntry::default()],
            extra: Map::new(),
        });
        assert_eq!(card.lorebook_entries().len(), 1);
    }
}
