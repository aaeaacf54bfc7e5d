//! The ingestion pipeline.
//!
//! ## Stages
//!
//! An upload moves through five stages:
//!
//! 1. **Received**: size check against the configured limit
//! 2. **Decoded**: PNG parsed, payload extracted, clean image built
//! 3. **Normalized**: definition classified, migrated, and repaired
//! 4. **DedupChecked**: both fingerprints looked up (advisory)
//! 5. **Persisted**: image written, then rows committed in one transaction
//!
//! Stages 1 to 4 have no side effects. In stage 5 the store enforces
//! fingerprint uniqueness at commit, so racing identical uploads yield one
//! record and one [`IngestionError::DuplicateContent`].
//!
//! The image lives in the artifact store, outside the row transaction. It is
//! written under the fresh character key before the commit, so committed rows
//! always have their image; if the commit fails the image is deleted again.
//!
//! ## Per-character operations
//!
//! Updates, image replacement, visibility changes, export, and deletion of an
//! existing character serialize on a per-character handle from a
//! [`ServicePool`]. Unrelated characters never contend.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use cardvault_card::{
    CharacterCard, ContentFingerprint, FormatError, OriginalFingerprint, UploadEnvelope,
    decode_card, encode_card, fingerprint::fingerprint_original_text, fingerprint_content,
    normalize, normalize_value, strip_card,
};
use cardvault_core::observability::ingest_span;
use cardvault_core::{
    ArtifactStore, CharacterId, OwnerId, PutCondition, PutOutcome, Redacted, sha256_hex,
};
use chrono::Utc;
use tokio::sync::{Mutex, MutexGuard};
use tracing::Instrument;

use crate::config::IngestConfig;
use crate::error::{DuplicateKind, IngestionError, Result};
use crate::hook::{self, ArtifactHook, NoopHook};
use crate::metrics;
use crate::pool::ServicePool;
use crate::record::{CharacterRow, DefinitionRow, IngestionRecord, NewDefinition, OriginalRow, Visibility};
use crate::store::{CharacterStore, StoreError, StoreResult, StoreTransaction};
use crate::tokenizer::{TokenMetrics, Tokenizer, default_tokenizer};

/// Progress of one ingestion attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    /// Upload accepted for processing.
    Received,
    /// Container parsed and payload extracted.
    Decoded,
    /// Definition normalized.
    Normalized,
    /// Advisory duplicate check passed.
    DedupChecked,
    /// Rows committed and image stored.
    Persisted,
}

impl Stage {
    /// Log label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Decoded => "decoded",
            Self::Normalized => "normalized",
            Self::DedupChecked => "dedup_checked",
            Self::Persisted => "persisted",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a replacement definition comes from.
#[derive(Debug, Clone)]
pub enum DefinitionSource {
    /// A card PNG; its payload is decoded.
    Upload(UploadEnvelope),
    /// Raw definition JSON text.
    Text(String),
    /// An already-parsed definition document.
    Document(serde_json::Value),
}

/// Per-character serialization handle.
#[derive(Debug)]
pub struct CharacterHandle {
    id: CharacterId,
    lock: Mutex<()>,
}

impl CharacterHandle {
    fn new(id: CharacterId) -> Self {
        Self {
            id,
            lock: Mutex::new(()),
        }
    }

    /// The character this handle guards.
    #[must_use]
    pub const fn id(&self) -> CharacterId {
        self.id
    }

    async fn lock(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().await
    }
}

/// Ingests character cards into a [`CharacterStore`] and an [`ArtifactStore`].
pub struct IngestPipeline {
    store: Arc<dyn CharacterStore>,
    artifacts: Arc<dyn ArtifactStore>,
    tokenizer: Arc<dyn Tokenizer>,
    hook: Arc<dyn ArtifactHook>,
    config: IngestConfig,
    handles: ServicePool<CharacterId, CharacterHandle>,
}

impl fmt::Debug for IngestPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IngestPipeline")
            .field("config", &self.config)
            .field("handles", &self.handles.len())
            .finish_non_exhaustive()
    }
}

impl IngestPipeline {
    /// Creates a pipeline with the default tokenizer and a no-op hook.
    #[must_use]
    pub fn new(
        store: Arc<dyn CharacterStore>,
        artifacts: Arc<dyn ArtifactStore>,
        config: IngestConfig,
    ) -> Self {
        let handles = ServicePool::new(config.handle_ttl());
        Self {
            store,
            artifacts,
            tokenizer: default_tokenizer(),
            hook: Arc::new(NoopHook),
            config,
            handles,
        }
    }

    /// Replaces the tokenizer.
    #[must_use]
    pub fn with_tokenizer(mut self, tokenizer: Arc<dyn Tokenizer>) -> Self {
        self.tokenizer = tokenizer;
        self
    }

    /// Replaces the post-commit hook.
    #[must_use]
    pub fn with_hook(mut self, hook: Arc<dyn ArtifactHook>) -> Self {
        self.hook = hook;
        self
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Drops per-character handles idle for longer than the TTL.
    pub fn evict_idle_handles(&self) -> usize {
        self.handles.evict_expired()
    }

    // ------------------------------------------------------------------
    // Ingestion
    // ------------------------------------------------------------------

    /// Ingests an uploaded card as a new character.
    ///
    /// # Errors
    ///
    /// Returns one [`IngestionError`] per failed attempt. Nothing is left
    /// behind by a failed attempt unless the error reports a failed
    /// compensation.
    #[tracing::instrument(
        name = "ingest",
        skip_all,
        fields(
            file = %Redacted(&upload.file_name),
            size = upload.size(),
            owner = %Redacted(owner),
            character = tracing::field::Empty,
        )
    )]
    pub async fn ingest(
        &self,
        upload: UploadEnvelope,
        owner: OwnerId,
        visibility: Visibility,
    ) -> Result<IngestionRecord> {
        let started = Instant::now();
        let mut stage = Stage::Received;
        let result = self.run_ingest(&upload, owner, visibility, &mut stage).await;
        let elapsed = started.elapsed().as_secs_f64();

        match &result {
            Ok(record) => {
                tracing::info!(character = %record.id(), "ingestion committed");
                metrics::record_outcome("ingest", None, elapsed);
            }
            Err(error) => {
                tracing::warn!(stage = %stage, kind = error.kind(), %error, "ingestion aborted");
                metrics::record_outcome("ingest", Some(error.kind()), elapsed);
            }
        }
        result
    }

    async fn run_ingest(
        &self,
        upload: &UploadEnvelope,
        owner: OwnerId,
        visibility: Visibility,
        stage: &mut Stage,
    ) -> Result<IngestionRecord> {
        self.check_size(upload.size())?;

        let decoded = decode_card(&upload.bytes)?;
        *stage = Stage::Decoded;

        let card = normalize(&decoded.definition_text)?;
        *stage = Stage::Normalized;

        let original_text = upload.original_text();
        let original_fingerprint = fingerprint_original_text(&original_text);
        let content_fingerprint = fingerprint_content(&card)?;
        self.check_duplicates(Some(&original_fingerprint), &content_fingerprint, None)
            .await?;
        *stage = Stage::DedupChecked;

        let record = self
            .persist_new(
                NewCharacter {
                    owner,
                    visibility,
                    card,
                    content_fingerprint,
                    original_text,
                    original_fingerprint,
                    origin: upload.origin.clone(),
                },
                decoded.clean_image,
            )
            .await?;
        *stage = Stage::Persisted;

        self.run_hook(record.id(), record.definition.card.summary_text());
        Ok(record)
    }

    /// Stage 5: the image write, then the row transaction.
    async fn persist_new(&self, new: NewCharacter, clean_image: Bytes) -> Result<IngestionRecord> {
        let id = CharacterId::generate();
        tracing::Span::current().record("character", tracing::field::display(id));

        let now = Utc::now();
        let token_metrics = TokenMetrics::compute(self.tokenizer.as_ref(), &new.card);
        let character = CharacterRow {
            id,
            owner: new.owner,
            name: new.card.data.name.clone(),
            visibility: new.visibility,
            image_etag: sha256_hex(&clean_image),
            token_metrics,
            created_at: now,
            updated_at: now,
        };
        let original = OriginalRow {
            character_id: id,
            fingerprint: new.original_fingerprint,
            text: new.original_text,
            origin: new.origin,
            created_at: now,
        };
        let definition = DefinitionRow {
            character_id: id,
            revision: 1,
            fingerprint: new.content_fingerprint,
            card: new.card,
            created_at: now,
        };

        // No rows exist yet, so a failed image write leaves nothing behind.
        let key = self.config.image_key(id);
        match self
            .artifacts
            .put(&key, clean_image.clone(), PutCondition::DoesNotExist)
            .await
        {
            Ok(PutOutcome::Written { .. }) => {}
            Ok(PutOutcome::PreconditionFailed { .. }) => {
                return Err(IngestionError::Persistence {
                    message: format!("image key {key} is already taken"),
                    source: None,
                    compensation: None,
                });
            }
            Err(error) => return Err(IngestionError::persistence("image write failed", error)),
        }

        let committed = self
            .commit_new_rows(&character, &original, &definition, token_metrics)
            .await;
        if let Err(cause) = committed {
            return Err(self.compensate_ingest(id, &key, cause).await);
        }

        Ok(IngestionRecord {
            character,
            original,
            definition,
            image: clean_image,
        })
    }

    async fn commit_new_rows(
        &self,
        character: &CharacterRow,
        original: &OriginalRow,
        definition: &DefinitionRow,
        token_metrics: TokenMetrics,
    ) -> Result<()> {
        let mut tx = self.store.begin().await?;
        let staged = stage_new_character(
            tx.as_mut(),
            character.clone(),
            original.clone(),
            NewDefinition {
                character_id: character.id,
                fingerprint: definition.fingerprint.clone(),
                card: definition.card.clone(),
                created_at: definition.created_at,
            },
            token_metrics,
        )
        .await;
        if let Err(error) = staged {
            rollback_quietly(tx).await;
            return Err(error.into());
        }
        tx.commit().await.map_err(commit_error)
    }

    /// Deletes the image of a character whose rows did not commit.
    ///
    /// Returns `cause`, with the compensation failure attached if the image
    /// could not be removed.
    async fn compensate_ingest(&self, id: CharacterId, key: &str, cause: IngestionError) -> IngestionError {
        tracing::debug!(character = %id, error = %cause, "row commit failed; deleting image");

        match self.artifacts.delete(key).await {
            Ok(()) => {
                metrics::record_compensation("ingest", true);
                cause
            }
            Err(error) => {
                metrics::record_compensation("ingest", false);
                let failure = format!("image delete failed: {error}");
                tracing::error!(character = %id, %failure, "compensating delete failed");
                cause.with_failed_compensation(failure)
            }
        }
    }

    // ------------------------------------------------------------------
    // Re-ingestion
    // ------------------------------------------------------------------

    /// Replaces the definition of an existing character.
    ///
    /// Runs decoding (for uploads), normalization, and a content duplicate
    /// check that ignores the character itself, then appends the definition
    /// and updates name and token metrics in one transaction. The stored
    /// image and original are untouched.
    ///
    /// # Errors
    ///
    /// Returns [`IngestionError::NotFound`] for an unknown character and the
    /// decoding, duplicate, and persistence errors of [`Self::ingest`].
    pub async fn re_ingest_definition(&self, id: CharacterId, source: DefinitionSource) -> Result<()> {
        let started = Instant::now();
        let result = self
            .run_re_ingest(id, source)
            .instrument(ingest_span("re_ingest", Some(&id.to_string())))
            .await;
        let elapsed = started.elapsed().as_secs_f64();
        match &result {
            Ok(()) => metrics::record_outcome("re_ingest", None, elapsed),
            Err(error) => {
                tracing::warn!(character = %id, kind = error.kind(), %error, "definition update aborted");
                metrics::record_outcome("re_ingest", Some(error.kind()), elapsed);
            }
        }
        result
    }

    async fn run_re_ingest(&self, id: CharacterId, source: DefinitionSource) -> Result<()> {
        let handle = self.handle(id).await?;
        let _guard = handle.lock().await;

        let card = self.definition_from(source)?;
        let fingerprint = fingerprint_content(&card)?;
        self.check_duplicates(None, &fingerprint, Some(id)).await?;

        let token_metrics = TokenMetrics::compute(self.tokenizer.as_ref(), &card);
        let summary = card.summary_text();
        let name = card.data.name.clone();

        let mut tx = self.store.begin().await?;
        let staged = stage_definition_update(
            tx.as_mut(),
            NewDefinition {
                character_id: id,
                fingerprint,
                card,
                created_at: Utc::now(),
            },
            name,
            token_metrics,
        )
        .await;
        if let Err(error) = staged {
            rollback_quietly(tx).await;
            return Err(error.into());
        }
        tx.commit().await.map_err(commit_error)?;

        tracing::info!(character = %id, "definition updated");
        self.run_hook(id, summary);
        Ok(())
    }

    fn definition_from(&self, source: DefinitionSource) -> Result<CharacterCard> {
        let card = match source {
            DefinitionSource::Upload(upload) => {
                self.check_size(upload.size())?;
                let decoded = decode_card(&upload.bytes)?;
                normalize(&decoded.definition_text)?
            }
            DefinitionSource::Text(text) => normalize(&text)?,
            DefinitionSource::Document(value) => normalize_value(value)?,
        };
        Ok(card)
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Reassembles the stored aggregate of a character.
    ///
    /// # Errors
    ///
    /// Returns [`IngestionError::Persistence`] if the store fails or a part
    /// of the aggregate is missing.
    pub async fn load(&self, id: CharacterId) -> Result<Option<IngestionRecord>> {
        let Some(character) = self.store.character(&id).await? else {
            return Ok(None);
        };
        let original = self
            .store
            .original(&id)
            .await?
            .ok_or_else(|| missing_part(id, "original"))?;
        let definition = self
            .store
            .current_definition(&id)
            .await?
            .ok_or_else(|| missing_part(id, "definition"))?;
        let image = self
            .read_image(&self.config.image_key(id))
            .await?
            .ok_or_else(|| missing_part(id, "image"))?;

        Ok(Some(IngestionRecord {
            character,
            original,
            definition,
            image,
        }))
    }

    /// Text handed to the artifact hook: description, personality and
    /// scenario of the current definition, joined by newlines.
    ///
    /// # Errors
    ///
    /// Returns [`IngestionError::NotFound`] if the character has no definition.
    pub async fn definition_text(&self, id: CharacterId) -> Result<String> {
        let definition = self
            .store
            .current_definition(&id)
            .await?
            .ok_or(IngestionError::NotFound(id))?;
        Ok(definition.card.summary_text())
    }

    /// Builds a downloadable card: the stored image with the current
    /// definition embedded.
    ///
    /// # Errors
    ///
    /// Returns [`IngestionError::NotFound`] for an unknown character.
    pub async fn export_card(&self, id: CharacterId) -> Result<Bytes> {
        self.run_export(id)
            .instrument(ingest_span("export", Some(&id.to_string())))
            .await
    }

    async fn run_export(&self, id: CharacterId) -> Result<Bytes> {
        let handle = self.handle(id).await?;
        let _guard = handle.lock().await;

        let definition = self
            .store
            .current_definition(&id)
            .await?
            .ok_or(IngestionError::NotFound(id))?;
        let image = self
            .read_image(&self.config.image_key(id))
            .await?
            .ok_or_else(|| missing_part(id, "image"))?;
        Ok(encode_card(&image, &definition.card)?)
    }

    // ------------------------------------------------------------------
    // Updates
    // ------------------------------------------------------------------

    /// Replaces the stored image. Text chunks are stripped from the new PNG.
    ///
    /// Returns the new image etag. If the etag update cannot be committed,
    /// the previous image is put back.
    ///
    /// # Errors
    ///
    /// Returns [`IngestionError::Format`] for an invalid PNG,
    /// [`IngestionError::NotFound`] for an unknown character, and
    /// [`IngestionError::Persistence`] for storage failures.
    pub async fn replace_image(&self, id: CharacterId, bytes: Bytes) -> Result<String> {
        self.run_replace_image(id, bytes)
            .instrument(ingest_span("replace_image", Some(&id.to_string())))
            .await
    }

    async fn run_replace_image(&self, id: CharacterId, bytes: Bytes) -> Result<String> {
        self.check_size(bytes.len())?;
        let clean = strip_card(&bytes)?;
        let etag = sha256_hex(&clean);

        let handle = self.handle(id).await?;
        let _guard = handle.lock().await;

        let key = self.config.image_key(id);
        let previous = self.read_image(&key).await?;
        self.artifacts.put(&key, clean, PutCondition::None).await?;

        if let Err(error) = self.commit_image_etag(id, etag.clone()).await {
            let cause = IngestionError::from(error);
            let restored = match previous {
                Some(image) => self
                    .artifacts
                    .put(&key, image, PutCondition::None)
                    .await
                    .map(|_| ()),
                None => self.artifacts.delete(&key).await,
            };
            return Err(match restored {
                Ok(()) => {
                    metrics::record_compensation("replace_image", true);
                    cause
                }
                Err(failure) => {
                    metrics::record_compensation("replace_image", false);
                    tracing::error!(character = %id, %failure, "failed to restore previous image");
                    cause.with_failed_compensation(failure)
                }
            });
        }

        tracing::info!(character = %id, %etag, "image replaced");
        Ok(etag)
    }

    async fn commit_image_etag(&self, id: CharacterId, etag: String) -> StoreResult<()> {
        let mut tx = self.store.begin().await?;
        if let Err(error) = tx.set_image_etag(id, etag).await {
            rollback_quietly(tx).await;
            return Err(error);
        }
        tx.commit().await
    }

    /// Changes who can see a character.
    ///
    /// # Errors
    ///
    /// Returns [`IngestionError::NotFound`] for an unknown character.
    pub async fn set_visibility(&self, id: CharacterId, visibility: Visibility) -> Result<()> {
        self.run_set_visibility(id, visibility)
            .instrument(ingest_span("set_visibility", Some(&id.to_string())))
            .await
    }

    async fn run_set_visibility(&self, id: CharacterId, visibility: Visibility) -> Result<()> {
        let handle = self.handle(id).await?;
        let _guard = handle.lock().await;

        let mut tx = self.store.begin().await?;
        if let Err(error) = tx.set_visibility(id, visibility).await {
            rollback_quietly(tx).await;
            return Err(error.into());
        }
        tx.commit().await?;
        tracing::info!(character = %id, ?visibility, "visibility changed");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Deletion
    // ------------------------------------------------------------------

    /// Deletes a character: rows and image together.
    ///
    /// The row delete is staged, the image removed, then the rows committed.
    /// If the commit fails the image is restored.
    ///
    /// # Errors
    ///
    /// Returns [`IngestionError::NotFound`] for an unknown character and
    /// [`IngestionError::Persistence`] for storage failures; the latter
    /// reports a failed compensation if the image could not be restored.
    pub async fn delete(&self, id: CharacterId) -> Result<()> {
        let result = self
            .run_delete(id)
            .instrument(ingest_span("delete", Some(&id.to_string())))
            .await;
        if result.is_ok() {
            self.handles.dispose(&id);
        }
        result
    }

    async fn run_delete(&self, id: CharacterId) -> Result<()> {
        let handle = self.handle(id).await?;
        let _guard = handle.lock().await;

        let key = self.config.image_key(id);
        let previous = self.read_image(&key).await?;

        let mut tx = self.store.begin().await?;
        if let Err(error) = tx.delete_character(id).await {
            rollback_quietly(tx).await;
            return Err(error.into());
        }
        if let Err(error) = self.artifacts.delete(&key).await {
            rollback_quietly(tx).await;
            return Err(IngestionError::persistence("image delete failed", error));
        }

        if let Err(error) = tx.commit().await {
            let cause = IngestionError::from(error);
            let Some(image) = previous else {
                return Err(cause);
            };
            return Err(match self.artifacts.put(&key, image, PutCondition::None).await {
                Ok(_) => {
                    metrics::record_compensation("delete", true);
                    cause
                }
                Err(failure) => {
                    metrics::record_compensation("delete", false);
                    tracing::error!(character = %id, %failure, "failed to restore image after aborted delete");
                    cause.with_failed_compensation(failure)
                }
            });
        }

        tracing::info!(character = %id, "character deleted");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn check_size(&self, size: usize) -> Result<()> {
        let limit = self.config.max_upload_len();
        if size > limit {
            return Err(FormatError::TooLarge { size, limit }.into());
        }
        Ok(())
    }

    /// Stage 4: advisory lookups of both fingerprints.
    async fn check_duplicates(
        &self,
        original: Option<&OriginalFingerprint>,
        content: &ContentFingerprint,
        exclude: Option<CharacterId>,
    ) -> Result<()> {
        if let Some(fingerprint) = original {
            if let Some(existing) = self.store.find_by_original(fingerprint).await? {
                metrics::record_duplicate("original", "advisory");
                return Err(IngestionError::DuplicateContent {
                    existing,
                    kind: DuplicateKind::Original,
                });
            }
        }
        let existing = self
            .store
            .find_by_content(content)
            .await?
            .filter(|found| Some(*found) != exclude);
        if let Some(existing) = existing {
            metrics::record_duplicate("content", "advisory");
            return Err(IngestionError::DuplicateContent {
                existing,
                kind: DuplicateKind::Content,
            });
        }
        Ok(())
    }

    async fn handle(&self, id: CharacterId) -> Result<Arc<CharacterHandle>> {
        self.handles
            .get_or_create(&id, || self.open_handle(id))
            .await
    }

    async fn open_handle(&self, id: CharacterId) -> Result<CharacterHandle> {
        match self.store.character(&id).await? {
            Some(_) => Ok(CharacterHandle::new(id)),
            None => Err(IngestionError::NotFound(id)),
        }
    }

    async fn read_image(&self, key: &str) -> Result<Option<Bytes>> {
        match self.artifacts.get(key).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(error) if error.is_not_found() => Ok(None),
            Err(error) => Err(error.into()),
        }
    }

    fn run_hook(&self, id: CharacterId, definition_text: String) {
        if self.config.hook_enabled {
            hook::spawn(Arc::clone(&self.hook), id, definition_text);
        }
    }
}

/// Inputs of stage 5 for a new character.
struct NewCharacter {
    owner: OwnerId,
    visibility: Visibility,
    card: CharacterCard,
    content_fingerprint: ContentFingerprint,
    original_text: String,
    original_fingerprint: OriginalFingerprint,
    origin: String,
}

/// Stages the four row writes of a new character.
async fn stage_new_character(
    tx: &mut dyn StoreTransaction,
    character: CharacterRow,
    original: OriginalRow,
    definition: NewDefinition,
    token_metrics: TokenMetrics,
) -> StoreResult<()> {
    let id = character.id;
    tx.insert_character(character).await?;
    tx.insert_original(original).await?;
    tx.insert_definition(definition).await?;
    tx.set_token_metrics(id, token_metrics).await
}

/// Stages the row writes of a definition update.
async fn stage_definition_update(
    tx: &mut dyn StoreTransaction,
    definition: NewDefinition,
    name: String,
    token_metrics: TokenMetrics,
) -> StoreResult<()> {
    let id = definition.character_id;
    tx.insert_definition(definition).await?;
    tx.set_character_name(id, name).await?;
    tx.set_token_metrics(id, token_metrics).await
}

async fn rollback_quietly(tx: Box<dyn StoreTransaction>) {
    if let Err(error) = tx.rollback().await {
        tracing::warn!(%error, "transaction rollback failed");
    }
}

/// Maps a commit failure, counting constraint-level duplicates.
fn commit_error(error: StoreError) -> IngestionError {
    if let StoreError::UniqueViolation { constraint, .. } = &error {
        metrics::record_duplicate(constraint.duplicate_kind().as_str(), "constraint");
    }
    error.into()
}

fn missing_part(id: CharacterId, part: &str) -> IngestionError {
    IngestionError::Persistence {
        message: format!("character {id} has no stored {part}"),
        source: None,
        compensation: None,
    }
}
