//! Definition normalization.
//!
//! Every accepted definition leaves here as a current-generation
//! [`CharacterCard`] whose lorebook positions are all enum strings.
//! Classification is a pure function of the parsed JSON value and runs once;
//! nothing downstream re-inspects the raw shape.

use serde_json::Value;

use crate::document::{
    CharacterBook, CharacterCard, CharacterDocument, LEGACY_FIELDS, LegacyCard, SPEC_V2,
};
use crate::error::SchemaError;

/// Shape of a parsed definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentShape {
    /// `chara_card_v2` envelope with a `data` object.
    Current,
    /// All six legacy fields and no `spec` key.
    Legacy,
    /// Neither; carries the reason.
    Unrecognized(&'static str),
}

/// Classifies a parsed JSON value. Current takes precedence over legacy.
#[must_use]
pub fn classify(value: &Value) -> DocumentShape {
    let Some(obj) = value.as_object() else {
        return DocumentShape::Unrecognized("definition is not a JSON object");
    };

    let is_current = obj.get("spec").and_then(Value::as_str) == Some(SPEC_V2)
        && obj.contains_key("spec_version")
        && obj.get("data").is_some_and(Value::is_object);
    if is_current {
        return DocumentShape::Current;
    }

    if obj.contains_key("spec") {
        return DocumentShape::Unrecognized("unsupported spec marker");
    }
    if LEGACY_FIELDS.iter().all(|field| obj.contains_key(*field)) {
        DocumentShape::Legacy
    } else {
        DocumentShape::Unrecognized("missing required legacy fields")
    }
}

impl CharacterDocument {
    /// Resolves a parsed JSON value into one of the two generations.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Unrecognized`] when the shape matches neither
    /// generation. Field values of unexpected types never fail: text fields
    /// keep their JSON text, and a lorebook that does not parse is kept
    /// verbatim among the unknown `data` keys.
    pub fn from_value(mut value: Value) -> Result<Self, SchemaError> {
        match classify(&value) {
            DocumentShape::Current => {
                let malformed_book = take_malformed_book(&mut value);
                let mut card: CharacterCard =
                    serde_json::from_value(value).map_err(SchemaError::InvalidCurrent)?;
                if let Some(book) = malformed_book {
                    card.data.extra.insert("character_book".to_string(), book);
                }
                Ok(Self::Current(card))
            }
            DocumentShape::Legacy => serde_json::from_value::<LegacyCard>(value)
                .map(Self::Legacy)
                .map_err(SchemaError::InvalidLegacy),
            DocumentShape::Unrecognized(reason) => Err(SchemaError::Unrecognized {
                reason: reason.to_string(),
            }),
        }
    }
}

/// Removes `data.character_book` if it is present but not a lorebook.
fn take_malformed_book(value: &mut Value) -> Option<Value> {
    let data = value.get_mut("data")?.as_object_mut()?;
    let book = data.get("character_book")?;
    if book.is_null() || serde_json::from_value::<CharacterBook>(book.clone()).is_ok() {
        return None;
    }
    tracing::debug!("keeping unparseable lorebook as an unknown key");
    data.remove("character_book")
}

/// Rewrites every lorebook entry position to its enum form.
///
/// Numeric `0` becomes `before_char`; any other non-enum value, including a
/// missing key, becomes `after_char`. Returns how many entries changed.
/// Running it twice changes nothing the second time.
pub fn repair_lorebook_positions(card: &mut CharacterCard) -> usize {
    let Some(book) = card.data.character_book.as_mut() else {
        return 0;
    };
    let mut repaired = 0;
    for entry in &mut book.entries {
        if !entry.position.is_repaired() {
            entry.position = entry.position.repaired();
            repaired += 1;
        }
    }
    repaired
}

/// Parses, classifies, migrates, and repairs a definition text.
///
/// A leading byte-order mark is ignored.
///
/// # Errors
///
/// Returns [`SchemaError::InvalidJson`] if the text is not JSON, and the
/// errors of [`normalize_value`] otherwise.
pub fn normalize(text: &str) -> Result<CharacterCard, SchemaError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let value: Value = serde_json::from_str(text).map_err(SchemaError::InvalidJson)?;
    normalize_value(value)
}

/// Classifies, migrates, and repairs an already-parsed definition.
///
/// # Errors
///
/// Returns [`SchemaError`] if the value is not a recognized definition.
pub fn normalize_value(value: Value) -> Result<CharacterCard, SchemaError> {
    let document = CharacterDocument::from_value(value)?;
    let migrated = matches!(document, CharacterDocument::Legacy(_));
    let mut card = document.into_current();
    let repaired = repair_lorebook_positions(&mut card);
    tracing::debug!(migrated, repaired, name = %card.data.name, "definition normalized");
    Ok(card)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{EntryPosition, SPEC_VERSION_V2};
    use serde_json::json;

    fn legacy_json() -> Value {
        json!({
            "name": "Ada",
            "description": "d",
            "personality": "p",
            "scenario": "s",
            "first_mes": "hello",
            "mes_example": "m"
        })
    }

    #[test]
    fn classify_shapes() {
        assert_eq!(classify(&legacy_json()), DocumentShape::Legacy);
        assert_eq!(
            classify(&json!({"spec": "chara_card_v2", "spec_version": "2.0", "data": {}})),
            DocumentShape::Current
        );
        assert!(matches!(
            classify(&json!({"spec": "chara_card_v3", "spec_version": "3.0", "data": {}})),
            DocumentShape::Unrecognized(_)
        ));
        assert!(matches!(
            classify(&json!({"spec": "chara_card_v2", "data": {}})),
            DocumentShape::Unrecognized(_)
        ));
        assert!(matches!(
            classify(&json!({"spec": "chara_card_v2", "spec_version": "2.0", "data": null})),
            DocumentShape::Unrecognized(_)
        ));
        assert!(matches!(classify(&json!([1, 2])), DocumentShape::Unrecognized(_)));
        assert!(matches!(
            classify(&json!({"name": "only"})),
            DocumentShape::Unrecognized(_)
        ));
    }

    #[test]
    fn legacy_with_spec_key_is_not_legacy() {
        let mut value = legacy_json();
        value["spec"] = json!("something_else");
        assert!(matches!(classify(&value), DocumentShape::Unrecognized(_)));
    }

    #[test]
    fn current_wins_over_legacy() {
        let mut value = legacy_json();
        value["spec"] = json!("chara_card_v2");
        value["spec_version"] = json!("2.0");
        value["data"] = json!({"name": "Inner"});
        let card = normalize_value(value).unwrap();
        assert_eq!(card.data.name, "Inner");
    }

    #[test]
    fn legacy_is_migrated() {
        let card = normalize(&legacy_json().to_string()).unwrap();
        assert_eq!(card.spec, SPEC_V2);
        assert_eq!(card.spec_version, SPEC_VERSION_V2);
        assert_eq!(card.data.name, "Ada");
        assert_eq!(card.data.first_mes, "hello");
        assert_eq!(card.data.creator_notes, "");
        assert!(card.data.character_book.is_none());
    }

    #[test]
    fn positions_are_repaired() {
        let text = json!({
            "spec": "chara_card_v2",
            "spec_version": "2.0",
            "data": {
                "name": "Lore",
                "character_book": {"entries": [
                    {"keys": ["a"], "position": 0},
                    {"keys": ["b"], "position": 1},
                    {"keys": ["c"], "position": "before_char"},
                    {"keys": ["d"]},
                    {"keys": ["e"], "position": "0"}
                ]}
            }
        })
        .to_string();
        let card = normalize(&text).unwrap();
        let positions: Vec<_> = card.lorebook_entries().iter().map(|e| e.position.clone()).collect();
        assert_eq!(
            positions,
            vec![
                EntryPosition::BeforeChar,
                EntryPosition::AfterChar,
                EntryPosition::BeforeChar,
                EntryPosition::AfterChar,
                EntryPosition::AfterChar,
            ]
        );
    }

    #[test]
    fn repair_is_idempotent() {
        let mut card = normalize(
            &json!({
                "spec": "chara_card_v2",
                "spec_version": "2.0",
                "data": {"character_book": {"entries": [{"position": 0}, {"position": 7}]}}
            })
            .to_string(),
        )
        .unwrap();
        let before = card.clone();
        assert_eq!(repair_lorebook_positions(&mut card), 0);
        assert_eq!(card, before);
    }

    #[test]
    fn bom_is_ignored() {
        let text = format!("\u{feff}{}", legacy_json());
        assert_eq!(normalize(&text).unwrap().data.name, "Ada");
    }

    #[test]
    fn invalid_inputs() {
        assert!(matches!(normalize("not json"), Err(SchemaError::InvalidJson(_))));
        assert!(matches!(
            normalize(r#"{"foo": 1}"#),
            Err(SchemaError::Unrecognized { .. })
        ));
        assert!(matches!(
            normalize(r#"{"spec":"chara_card_v3","spec_version":"3.0","data":{}}"#),
            Err(SchemaError::Unrecognized { .. })
        ));
    }

    #[test]
    fn mistyped_legacy_fields_still_migrate() {
        let mut legacy = legacy_json();
        legacy["first_mes"] = json!(["hi", 2]);
        legacy["mes_example"] = json!(5);
        legacy["scenario"] = Value::Null;

        let card = normalize_value(legacy).unwrap();
        assert_eq!(card.data.first_mes, r#"["hi",2]"#);
        assert_eq!(card.data.mes_example, "5");
        assert_eq!(card.data.scenario, "");
        assert_eq!(card.data.name, "Ada");
    }

    #[test]
    fn mistyped_current_fields_are_coerced() {
        let card = normalize(
            r#"{"spec":"chara_card_v2","spec_version":2,"data":{
                "name":5,"character_version":1,"tags":"x, y",
                "alternate_greetings":[1,"two"],"extensions":"raw"}}"#,
        )
        .unwrap();

        assert_eq!(card.spec_version, "2");
        assert_eq!(card.data.name, "5");
        assert_eq!(card.data.character_version, "1");
        assert_eq!(card.data.tags, vec!["x, y".to_string()]);
        assert_eq!(card.data.alternate_greetings, vec!["1".to_string(), "two".to_string()]);
        assert_eq!(card.data.extensions, json!("raw"));
    }

    #[test]
    fn unparseable_lorebook_is_kept_verbatim() {
        let card = normalize_value(json!({
            "spec": "chara_card_v2",
            "spec_version": "2.0",
            "data": {"name": "N", "character_book": {"entries": [null, {"position": 0}]}}
        }))
        .unwrap();

        assert!(card.data.character_book.is_none());
        let back = serde_json::to_value(&card).unwrap();
        assert_eq!(
            back["data"]["character_book"],
            json!({"entries": [null, {"position": 0}]})
        );
    }
}
