//! Failure-injecting storage wrappers with operation recording.
//!
//! [`FailingStore`] wraps an [`InMemoryStore`] and can fail any transaction
//! step; [`FailingArtifactStore`] wraps a [`MemoryArtifactStore`] and can fail
//! any operation on keys with a given prefix. Rules fire either always or
//! after a number of matching calls have succeeded.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use cardvault_card::{ContentFingerprint, OriginalFingerprint};
use cardvault_core::error::{Error, Result};
use cardvault_core::{ArtifactStore, CharacterId, MemoryArtifactStore, PutCondition, PutOutcome};
use cardvault_ingest::record::{CharacterRow, DefinitionRow, NewDefinition, OriginalRow, Visibility};
use cardvault_ingest::store::{CharacterStore, StoreError, StoreResult, StoreTransaction};
use cardvault_ingest::{InMemoryStore, TokenMetrics};

#[derive(Debug, Clone)]
struct Rule<K> {
    kind: K,
    prefix: String,
    skip: usize,
}

#[derive(Debug)]
struct Rules<K> {
    rules: Vec<Rule<K>>,
}

impl<K> Default for Rules<K> {
    fn default() -> Self {
        Self { rules: Vec::new() }
    }
}

impl<K: PartialEq> Rules<K> {
    /// Returns true if this call should fail; consumes one skip otherwise.
    fn should_fail(&mut self, kind: &K, key: &str) -> bool {
        let mut fail = false;
        for rule in self
            .rules
            .iter_mut()
            .filter(|r| &r.kind == kind && key.starts_with(&r.prefix))
        {
            if rule.skip == 0 {
                fail = true;
            } else {
                rule.skip -= 1;
            }
        }
        fail
    }
}

// ============================================================================
// Row store
// ============================================================================

/// A transaction step that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStep {
    /// [`CharacterStore::begin`].
    Begin,
    /// [`StoreTransaction::insert_character`].
    InsertCharacter,
    /// [`StoreTransaction::insert_original`].
    InsertOriginal,
    /// [`StoreTransaction::insert_definition`].
    InsertDefinition,
    /// [`StoreTransaction::set_token_metrics`].
    SetTokenMetrics,
    /// [`StoreTransaction::set_character_name`].
    SetName,
    /// [`StoreTransaction::set_visibility`].
    SetVisibility,
    /// [`StoreTransaction::set_image_etag`].
    SetImageEtag,
    /// [`StoreTransaction::delete_character`].
    DeleteCharacter,
    /// [`StoreTransaction::commit`].
    Commit,
}

/// Row store that fails chosen transaction steps and records every step.
#[derive(Debug, Clone)]
pub struct FailingStore {
    inner: InMemoryStore,
    rules: Arc<Mutex<Rules<TxStep>>>,
    steps: Arc<Mutex<Vec<TxStep>>>,
    blind: Arc<AtomicBool>,
}

impl FailingStore {
    /// Wraps `inner`.
    #[must_use]
    pub fn new(inner: InMemoryStore) -> Self {
        Self {
            inner,
            rules: Arc::default(),
            steps: Arc::default(),
            blind: Arc::default(),
        }
    }

    /// The wrapped store.
    pub fn inner(&self) -> &InMemoryStore {
        &self.inner
    }

    /// Fails every call of `step`.
    pub fn fail_at(&self, step: TxStep) {
        self.fail_at_after(step, 0);
    }

    /// Fails calls of `step` once `successes` calls have gone through.
    pub fn fail_at_after(&self, step: TxStep, successes: usize) {
        self.rules.lock().expect("lock").rules.push(Rule {
            kind: step,
            prefix: String::new(),
            skip: successes,
        });
    }

    /// Removes all failure rules.
    pub fn clear_failures(&self) {
        self.rules.lock().expect("lock").rules.clear();
    }

    /// Makes fingerprint lookups report no match, so only the commit-time
    /// constraint can detect duplicates.
    pub fn blind_lookups(&self) {
        self.blind.store(true, Ordering::SeqCst);
    }

    fn is_blind(&self) -> bool {
        self.blind.load(Ordering::SeqCst)
    }

    /// Steps attempted so far, in order.
    pub fn steps(&self) -> Vec<TxStep> {
        self.steps.lock().expect("lock").clone()
    }

    fn check(rules: &Mutex<Rules<TxStep>>, steps: &Mutex<Vec<TxStep>>, step: TxStep) -> StoreResult<()> {
        steps.lock().expect("lock").push(step);
        if rules.lock().expect("lock").should_fail(&step, "") {
            return Err(StoreError::backend(format!("injected failure at {step:?}")));
        }
        Ok(())
    }
}

#[async_trait]
impl CharacterStore for FailingStore {
    async fn find_by_original(&self, fingerprint: &OriginalFingerprint) -> StoreResult<Option<CharacterId>> {
        if self.is_blind() {
            return Ok(None);
        }
        self.inner.find_by_original(fingerprint).await
    }

    async fn find_by_content(&self, fingerprint: &ContentFingerprint) -> StoreResult<Option<CharacterId>> {
        if self.is_blind() {
            return Ok(None);
        }
        self.inner.find_by_content(fingerprint).await
    }

    async fn character(&self, id: &CharacterId) -> StoreResult<Option<CharacterRow>> {
        self.inner.character(id).await
    }

    async fn current_definition(&self, id: &CharacterId) -> StoreResult<Option<DefinitionRow>> {
        self.inner.current_definition(id).await
    }

    async fn definition_history(&self, id: &CharacterId) -> StoreResult<Vec<DefinitionRow>> {
        self.inner.definition_history(id).await
    }

    async fn original(&self, id: &CharacterId) -> StoreResult<Option<OriginalRow>> {
        self.inner.original(id).await
    }

    async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>> {
        Self::check(&self.rules, &self.steps, TxStep::Begin)?;
        Ok(Box::new(FailingTransaction {
            inner: self.inner.begin().await?,
            rules: Arc::clone(&self.rules),
            steps: Arc::clone(&self.steps),
        }))
    }
}

struct FailingTransaction {
    inner: Box<dyn StoreTransaction>,
    rules: Arc<Mutex<Rules<TxStep>>>,
    steps: Arc<Mutex<Vec<TxStep>>>,
}

impl FailingTransaction {
    fn check(&self, step: TxStep) -> StoreResult<()> {
        FailingStore::check(&self.rules, &self.steps, step)
    }
}

#[async_trait]
impl StoreTransaction for FailingTransaction {
    async fn insert_character(&mut self, row: CharacterRow) -> StoreResult<()> {
        self.check(TxStep::InsertCharacter)?;
        self.inner.insert_character(row).await
    }

    async fn insert_original(&mut self, row: OriginalRow) -> StoreResult<()> {
        self.check(TxStep::InsertOriginal)?;
        self.inner.insert_original(row).await
    }

    async fn insert_definition(&mut self, definition: NewDefinition) -> StoreResult<()> {
        self.check(TxStep::InsertDefinition)?;
        self.inner.insert_definition(definition).await
    }

    async fn set_token_metrics(&mut self, id: CharacterId, metrics: TokenMetrics) -> StoreResult<()> {
        self.check(TxStep::SetTokenMetrics)?;
        self.inner.set_token_metrics(id, metrics).await
    }

    async fn set_character_name(&mut self, id: CharacterId, name: String) -> StoreResult<()> {
        self.check(TxStep::SetName)?;
        self.inner.set_character_name(id, name).await
    }

    async fn set_visibility(&mut self, id: CharacterId, visibility: Visibility) -> StoreResult<()> {
        self.check(TxStep::SetVisibility)?;
        self.inner.set_visibility(id, visibility).await
    }

    async fn set_image_etag(&mut self, id: CharacterId, etag: String) -> StoreResult<()> {
        self.check(TxStep::SetImageEtag)?;
        self.inner.set_image_etag(id, etag).await
    }

    async fn delete_character(&mut self, id: CharacterId) -> StoreResult<()> {
        self.check(TxStep::DeleteCharacter)?;
        self.inner.delete_character(id).await
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.check(TxStep::Commit)?;
        let this = *self;
        this.inner.commit().await
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        let this = *self;
        this.inner.rollback().await
    }
}

// ============================================================================
// Artifact store
// ============================================================================

/// An artifact operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactOpKind {
    /// Read.
    Get,
    /// Write.
    Put,
    /// Delete.
    Delete,
}

/// Record of an artifact operation for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactOp {
    /// Operation kind.
    pub kind: ArtifactOpKind,
    /// Key the operation targeted.
    pub key: String,
}

/// Artifact store that fails chosen operations and records every call.
#[derive(Debug, Clone, Default)]
pub struct FailingArtifactStore {
    inner: MemoryArtifactStore,
    rules: Arc<Mutex<Rules<ArtifactOpKind>>>,
    operations: Arc<Mutex<Vec<ArtifactOp>>>,
}

impl FailingArtifactStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The wrapped store.
    pub fn inner(&self) -> &MemoryArtifactStore {
        &self.inner
    }

    /// Fails every `kind` operation on keys starting with `prefix`.
    pub fn inject_failure(&self, kind: ArtifactOpKind, prefix: impl Into<String>) {
        self.inject_failure_after(kind, prefix, 0);
    }

    /// Like [`Self::inject_failure`], but only once `successes` matching
    /// calls have gone through.
    pub fn inject_failure_after(&self, kind: ArtifactOpKind, prefix: impl Into<String>, successes: usize) {
        self.rules.lock().expect("lock").rules.push(Rule {
            kind,
            prefix: prefix.into(),
            skip: successes,
        });
    }

    /// Removes all failure rules.
    pub fn clear_failures(&self) {
        self.rules.lock().expect("lock").rules.clear();
    }

    /// Returns all recorded operations.
    pub fn operations(&self) -> Vec<ArtifactOp> {
        self.operations.lock().expect("lock").clone()
    }

    /// Returns all stored keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        self.inner.keys().expect("keys")
    }

    fn check(&self, kind: ArtifactOpKind, key: &str) -> Result<()> {
        self.operations.lock().expect("lock").push(ArtifactOp {
            kind,
            key: key.to_string(),
        });
        if self.rules.lock().expect("lock").should_fail(&kind, key) {
            return Err(Error::storage(format!("injected {kind:?} failure for {key}")));
        }
        Ok(())
    }
}

#[async_trait]
impl ArtifactStore for FailingArtifactStore {
    async fn get(&self, key: &str) -> Result<Bytes> {
        self.check(ArtifactOpKind::Get, key)?;
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, data: Bytes, condition: PutCondition) -> Result<PutOutcome> {
        self.check(ArtifactOpKind::Put, key)?;
        self.inner.put(key, data, condition).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.check(ArtifactOpKind::Delete, key)?;
        self.inner.delete(key).await
    }
}
