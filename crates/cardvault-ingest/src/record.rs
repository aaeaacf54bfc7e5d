//! Durable rows and the ingestion aggregate.

use bytes::Bytes;
use cardvault_card::{CharacterCard, ContentFingerprint, OriginalFingerprint};
use cardvault_core::{CharacterId, OwnerId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::tokenizer::TokenMetrics;

/// Who can see a character.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Owner only.
    #[default]
    Private,
    /// Anyone.
    Public,
}

/// The character identity row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterRow {
    /// Character identity.
    pub id: CharacterId,
    /// Owning account.
    pub owner: OwnerId,
    /// Display name, taken from the current definition.
    pub name: String,
    /// Visibility.
    pub visibility: Visibility,
    /// SHA-256 hex of the stored clean image.
    pub image_etag: String,
    /// Token counts of the current definition.
    pub token_metrics: TokenMetrics,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

/// The verbatim original upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginalRow {
    /// Owning character.
    pub character_id: CharacterId,
    /// Fingerprint of `text`.
    pub fingerprint: OriginalFingerprint,
    /// The original record JSON text.
    pub text: String,
    /// Where the upload came from.
    pub origin: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// A definition to be appended to a character's history.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDefinition {
    /// Owning character.
    pub character_id: CharacterId,
    /// Content fingerprint of `card`.
    pub fingerprint: ContentFingerprint,
    /// Normalized card.
    pub card: CharacterCard,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// A stored definition revision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefinitionRow {
    /// Owning character.
    pub character_id: CharacterId,
    /// 1-based revision number; the highest is current.
    pub revision: u32,
    /// Content fingerprint of `card`.
    pub fingerprint: ContentFingerprint,
    /// Normalized card.
    pub card: CharacterCard,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// Everything persisted for one character.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestionRecord {
    /// Identity row.
    pub character: CharacterRow,
    /// Original upload.
    pub original: OriginalRow,
    /// Current definition.
    pub definition: DefinitionRow,
    /// Clean image bytes.
    pub image: Bytes,
}

impl IngestionRecord {
    /// Character identity.
    #[must_use]
    pub const fn id(&self) -> CharacterId {
        self.character.id
    }
}
