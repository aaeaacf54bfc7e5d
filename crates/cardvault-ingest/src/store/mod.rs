//! Durable store for character rows.
//!
//! Reads go straight to the store. Writes are staged on a
//! [`StoreTransaction`] and applied atomically by
//! [`StoreTransaction::commit`], which also enforces the fingerprint
//! uniqueness constraints. A transaction dropped without commit applies
//! nothing.

pub mod memory;

use std::fmt;

use async_trait::async_trait;
use cardvault_card::{ContentFingerprint, OriginalFingerprint};
use cardvault_core::CharacterId;
use thiserror::Error;

use crate::error::DuplicateKind;
use crate::record::{CharacterRow, DefinitionRow, NewDefinition, OriginalRow, Visibility};
use crate::tokenizer::TokenMetrics;

pub use memory::InMemoryStore;

/// Result type alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Uniqueness constraints enforced at commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    /// One current definition per content fingerprint.
    ContentFingerprint,
    /// One original per original fingerprint.
    OriginalFingerprint,
}

impl Constraint {
    /// The duplicate kind this constraint reports.
    #[must_use]
    pub const fn duplicate_kind(self) -> DuplicateKind {
        match self {
            Self::ContentFingerprint => DuplicateKind::Content,
            Self::OriginalFingerprint => DuplicateKind::Original,
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ContentFingerprint => "content_fingerprint",
            Self::OriginalFingerprint => "original_fingerprint",
        })
    }
}

/// Store failures.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Commit would violate a uniqueness constraint.
    #[error("unique constraint {constraint} violated; held by character {existing}")]
    UniqueViolation {
        /// The violated constraint.
        constraint: Constraint,
        /// The character that already holds the value.
        existing: CharacterId,
    },

    /// A staged update targets a character that does not exist.
    #[error("character not found: {0}")]
    CharacterNotFound(CharacterId),

    /// The backend failed.
    #[error("store backend error: {message}")]
    Backend {
        /// Description of the failure.
        message: String,
        /// Underlying cause, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl StoreError {
    /// Creates a backend error.
    #[must_use]
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
            source: None,
        }
    }
}

/// Read side of the durable store.
#[async_trait]
pub trait CharacterStore: Send + Sync + 'static {
    /// Finds the character whose original has this fingerprint.
    async fn find_by_original(&self, fingerprint: &OriginalFingerprint)
        -> StoreResult<Option<CharacterId>>;

    /// Finds the character whose current definition has this fingerprint.
    async fn find_by_content(&self, fingerprint: &ContentFingerprint)
        -> StoreResult<Option<CharacterId>>;

    /// Gets a character row.
    async fn character(&self, id: &CharacterId) -> StoreResult<Option<CharacterRow>>;

    /// Gets the current (highest revision) definition.
    async fn current_definition(&self, id: &CharacterId) -> StoreResult<Option<DefinitionRow>>;

    /// Gets every definition revision, oldest first.
    async fn definition_history(&self, id: &CharacterId) -> StoreResult<Vec<DefinitionRow>>;

    /// Gets the original upload.
    async fn original(&self, id: &CharacterId) -> StoreResult<Option<OriginalRow>>;

    /// Starts a transaction.
    async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>>;
}

/// Staged writes applied atomically on commit.
///
/// Each staging call may fail (a real backend executes statements eagerly
/// inside its transaction); a failed call leaves the transaction usable only
/// for [`StoreTransaction::rollback`].
#[async_trait]
pub trait StoreTransaction: Send {
    /// Inserts a character row.
    async fn insert_character(&mut self, row: CharacterRow) -> StoreResult<()>;

    /// Inserts the original upload.
    async fn insert_original(&mut self, row: OriginalRow) -> StoreResult<()>;

    /// Appends a definition revision; it becomes current.
    async fn insert_definition(&mut self, definition: NewDefinition) -> StoreResult<()>;

    /// Sets the token metrics of a character.
    async fn set_token_metrics(&mut self, id: CharacterId, metrics: TokenMetrics)
        -> StoreResult<()>;

    /// Sets the display name of a character.
    async fn set_character_name(&mut self, id: CharacterId, name: String) -> StoreResult<()>;

    /// Sets the visibility of a character.
    async fn set_visibility(&mut self, id: CharacterId, visibility: Visibility) -> StoreResult<()>;

    /// Sets the image etag of a character.
    async fn set_image_etag(&mut self, id: CharacterId, etag: String) -> StoreResult<()>;

    /// Deletes a character together with its original and definitions.
    async fn delete_character(&mut self, id: CharacterId) -> StoreResult<()>;

    /// Applies all staged writes atomically.
    async fn commit(self: Box<Self>) -> StoreResult<()>;

    /// Discards all staged writes.
    async fn rollback(self: Box<Self>) -> StoreResult<()>;
}
