//! In-memory store implementation for testing.
//!
//! This module provides [`InMemoryStore`], a reference implementation of
//! [`CharacterStore`]. A commit clones the current state, applies the staged
//! writes to the clone, checks constraints, and swaps the clone in, all under
//! one write lock, so readers never observe a partial commit.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use cardvault_card::{ContentFingerprint, OriginalFingerprint};
use cardvault_core::CharacterId;
use chrono::{DateTime, Utc};

use super::{CharacterStore, Constraint, StoreError, StoreResult, StoreTransaction};
use crate::record::{CharacterRow, DefinitionRow, NewDefinition, OriginalRow, Visibility};
use crate::tokenizer::TokenMetrics;

#[derive(Debug, Clone, Default)]
struct State {
    characters: BTreeMap<CharacterId, CharacterRow>,
    originals: BTreeMap<CharacterId, OriginalRow>,
    definitions: BTreeMap<CharacterId, Vec<DefinitionRow>>,
}

impl State {
    fn current(&self, id: &CharacterId) -> Option<&DefinitionRow> {
        self.definitions.get(id).and_then(|revs| revs.last())
    }

    fn character_mut(&mut self, id: CharacterId) -> StoreResult<&mut CharacterRow> {
        self.characters
            .get_mut(&id)
            .ok_or(StoreError::CharacterNotFound(id))
    }

    fn apply(&mut self, op: Op, now: DateTime<Utc>) -> StoreResult<()> {
        match op {
            Op::InsertCharacter(row) => {
                if self.characters.contains_key(&row.id) {
                    return Err(StoreError::backend(format!(
                        "duplicate primary key for character {}",
                        row.id
                    )));
                }
                self.characters.insert(row.id, row);
            }
            Op::InsertOriginal(row) => {
                if !self.characters.contains_key(&row.character_id) {
                    return Err(StoreError::CharacterNotFound(row.character_id));
                }
                self.originals.insert(row.character_id, row);
            }
            Op::InsertDefinition(def) => {
                if !self.characters.contains_key(&def.character_id) {
                    return Err(StoreError::CharacterNotFound(def.character_id));
                }
                let revisions = self.definitions.entry(def.character_id).or_default();
                let revision = revisions.last().map_or(1, |r| r.revision + 1);
                revisions.push(DefinitionRow {
                    character_id: def.character_id,
                    revision,
                    fingerprint: def.fingerprint,
                    card: def.card,
                    created_at: def.created_at,
                });
            }
            Op::SetTokenMetrics(id, metrics) => {
                let row = self.character_mut(id)?;
                row.token_metrics = metrics;
                row.updated_at = now;
            }
            Op::SetName(id, name) => {
                let row = self.character_mut(id)?;
                row.name = name;
                row.updated_at = now;
            }
            Op::SetVisibility(id, visibility) => {
                let row = self.character_mut(id)?;
                row.visibility = visibility;
                row.updated_at = now;
            }
            Op::SetImageEtag(id, etag) => {
                let row = self.character_mut(id)?;
                row.image_etag = etag;
                row.updated_at = now;
            }
            Op::DeleteCharacter(id) => {
                if self.characters.remove(&id).is_none() {
                    return Err(StoreError::CharacterNotFound(id));
                }
                self.originals.remove(&id);
                self.definitions.remove(&id);
            }
        }
        Ok(())
    }

    /// Checks both fingerprint constraints for the touched characters.
    fn check_unique(&self, touched: &[CharacterId]) -> StoreResult<()> {
        let mut content: HashMap<&ContentFingerprint, CharacterId> = HashMap::new();
        let mut original: HashMap<&OriginalFingerprint, CharacterId> = HashMap::new();
        for id in self.characters.keys().filter(|id| !touched.contains(*id)) {
            if let Some(def) = self.current(id) {
                content.insert(&def.fingerprint, *id);
            }
            if let Some(orig) = self.originals.get(id) {
                original.insert(&orig.fingerprint, *id);
            }
        }

        for id in touched {
            if let Some(def) = self.current(id) {
                if let Some(existing) = content.insert(&def.fingerprint, *id) {
                    return Err(StoreError::UniqueViolation {
                        constraint: Constraint::ContentFingerprint,
                        existing,
                    });
                }
            }
            if let Some(orig) = self.originals.get(id) {
                if let Some(existing) = original.insert(&orig.fingerprint, *id) {
                    return Err(StoreError::UniqueViolation {
                        constraint: Constraint::OriginalFingerprint,
                        existing,
                    });
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
enum Op {
    InsertCharacter(CharacterRow),
    InsertOriginal(OriginalRow),
    InsertDefinition(NewDefinition),
    SetTokenMetrics(CharacterId, TokenMetrics),
    SetName(CharacterId, String),
    SetVisibility(CharacterId, Visibility),
    SetImageEtag(CharacterId, String),
    DeleteCharacter(CharacterId),
}

impl Op {
    fn target(&self) -> CharacterId {
        match self {
            Self::InsertCharacter(row) => row.id,
            Self::InsertOriginal(row) => row.character_id,
            Self::InsertDefinition(def) => def.character_id,
            Self::SetTokenMetrics(id, _)
            | Self::SetName(id, _)
            | Self::SetVisibility(id, _)
            | Self::SetImageEtag(id, _)
            | Self::DeleteCharacter(id) => *id,
        }
    }
}

/// Converts a lock poison error to a store error.
fn poison_err<T>(_: PoisonError<T>) -> StoreError {
    StoreError::backend("lock poisoned")
}

/// Thread-safe in-memory [`CharacterStore`].
///
/// Clones share state.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<State>>,
    commits: Arc<AtomicU64>,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of characters.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn character_count(&self) -> StoreResult<usize> {
        Ok(self.state.read().map_err(poison_err)?.characters.len())
    }

    /// Number of originals.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn original_count(&self) -> StoreResult<usize> {
        Ok(self.state.read().map_err(poison_err)?.originals.len())
    }

    /// Number of stored definition revisions across all characters.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn definition_count(&self) -> StoreResult<usize> {
        Ok(self
            .state
            .read()
            .map_err(poison_err)?
            .definitions
            .values()
            .map(Vec::len)
            .sum())
    }

    /// Number of successful commits so far.
    #[must_use]
    pub fn commit_count(&self) -> u64 {
        self.commits.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CharacterStore for InMemoryStore {
    async fn find_by_original(
        &self,
        fingerprint: &OriginalFingerprint,
    ) -> StoreResult<Option<CharacterId>> {
        let state = self.state.read().map_err(poison_err)?;
        Ok(state
            .originals
            .values()
            .find(|row| &row.fingerprint == fingerprint)
            .map(|row| row.character_id))
    }

    async fn find_by_content(
        &self,
        fingerprint: &ContentFingerprint,
    ) -> StoreResult<Option<CharacterId>> {
        let state = self.state.read().map_err(poison_err)?;
        Ok(state
            .definitions
            .iter()
            .find(|(_, revs)| revs.last().is_some_and(|r| &r.fingerprint == fingerprint))
            .map(|(id, _)| *id))
    }

    async fn character(&self, id: &CharacterId) -> StoreResult<Option<CharacterRow>> {
        let state = self.state.read().map_err(poison_err)?;
        Ok(state.characters.get(id).cloned())
    }

    async fn current_definition(&self, id: &CharacterId) -> StoreResult<Option<DefinitionRow>> {
        let state = self.state.read().map_err(poison_err)?;
        Ok(state.current(id).cloned())
    }

    async fn definition_history(&self, id: &CharacterId) -> StoreResult<Vec<DefinitionRow>> {
        let state = self.state.read().map_err(poison_err)?;
        Ok(state.definitions.get(id).cloned().unwrap_or_default())
    }

    async fn original(&self, id: &CharacterId) -> StoreResult<Option<OriginalRow>> {
        let state = self.state.read().map_err(poison_err)?;
        Ok(state.originals.get(id).cloned())
    }

    async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>> {
        Ok(Box::new(MemoryTransaction {
            state: Arc::clone(&self.state),
            commits: Arc::clone(&self.commits),
            ops: Vec::new(),
        }))
    }
}

/// Transaction over an [`InMemoryStore`].
struct MemoryTransaction {
    state: Arc<RwLock<State>>,
    commits: Arc<AtomicU64>,
    ops: Vec<Op>,
}

impl MemoryTransaction {
    fn stage(&mut self, op: Op) -> StoreResult<()> {
        self.ops.push(op);
        Ok(())
    }
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn insert_character(&mut self, row: CharacterRow) -> StoreResult<()> {
        self.stage(Op::InsertCharacter(row))
    }

    async fn insert_original(&mut self, row: OriginalRow) -> StoreResult<()> {
        self.stage(Op::InsertOriginal(row))
    }

    async fn insert_definition(&mut self, definition: NewDefinition) -> StoreResult<()> {
        self.stage(Op::InsertDefinition(definition))
    }

    async fn set_token_metrics(
        &mut self,
        id: CharacterId,
        metrics: TokenMetrics,
    ) -> StoreResult<()> {
        self.stage(Op::SetTokenMetrics(id, metrics))
    }

    async fn set_character_name(&mut self, id: CharacterId, name: String) -> StoreResult<()> {
        self.stage(Op::SetName(id, name))
    }

    async fn set_visibility(&mut self, id: CharacterId, visibility: Visibility) -> StoreResult<()> {
        self.stage(Op::SetVisibility(id, visibility))
    }

    async fn set_image_etag(&mut self, id: CharacterId, etag: String) -> StoreResult<()> {
        self.stage(Op::SetImageEtag(id, etag))
    }

    async fn delete_character(&mut self, id: CharacterId) -> StoreResult<()> {
        self.stage(Op::DeleteCharacter(id))
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let Self {
            state,
            commits,
            ops,
        } = *self;
        let mut guard = state.write().map_err(poison_err)?;

        let mut touched: Vec<CharacterId> = ops.iter().map(Op::target).collect();
        touched.sort();
        touched.dedup();

        let now = Utc::now();
        let mut next = guard.clone();
        for op in ops {
            next.apply(op, now)?;
        }
        next.check_unique(&touched)?;

        *guard = next;
        commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        Ok(())
    }
}
