//! Pre-built fixtures for card and pipeline tests.

use std::sync::Arc;

use bytes::Bytes;
use cardvault_card::UploadEnvelope;
use cardvault_card::chunk::{self, Chunk, ChunkType};
use cardvault_card::text_chunk::payload_chunk;
use cardvault_core::OwnerId;
use cardvault_ingest::{IngestConfig, IngestPipeline, IngestionRecord, InMemoryStore, Visibility};
use serde_json::json;

use crate::hooks::RecordingHook;
use crate::storage::{FailingArtifactStore, FailingStore};

/// Chunks of a minimal 1x1 RGBA PNG, without any text chunk.
pub fn base_chunks() -> Vec<Chunk> {
    vec![
        Chunk::new(
            ChunkType::IHDR,
            vec![0, 0, 0, 1, 0, 0, 0, 1, 8, 6, 0, 0, 0],
        ),
        Chunk::new(
            ChunkType::IDAT,
            vec![0x78, 0x9c, 0x63, 0x60, 0, 0, 0, 2, 0, 1],
        ),
        Chunk::new(ChunkType::IEND, Bytes::new()),
    ]
}

/// A minimal PNG without any text chunk.
pub fn blank_png() -> Bytes {
    chunk::serialize(&base_chunks())
}

/// A blank PNG whose pixel data differs per `seed`, for distinct originals.
pub fn blank_png_variant(seed: u8) -> Bytes {
    let mut chunks = base_chunks();
    chunks.insert(1, Chunk::new(ChunkType::new(*b"tIME"), vec![0, 0, 1, 1, 0, 0, seed]));
    chunk::serialize(&chunks)
}

/// A card PNG carrying `definition` as its `chara` payload.
pub fn card_png(definition: &str) -> Bytes {
    let mut chunks = base_chunks();
    let end = chunks.len() - 1;
    chunks.insert(end, payload_chunk(definition));
    chunk::serialize(&chunks)
}

/// A legacy (flat) definition named `name`.
pub fn legacy_definition(name: &str) -> String {
    json!({
        "name": name,
        "description": format!("{name} keeps the lighthouse"),
        "personality": "patient",
        "scenario": "a stormy coast",
        "first_mes": "The lamp is lit.",
        "mes_example": "<START>"
    })
    .to_string()
}

/// A `chara_card_v2` definition named `name`.
pub fn v2_definition(name: &str) -> String {
    json!({
        "spec": "chara_card_v2",
        "spec_version": "2.0",
        "data": {
            "name": name,
            "description": format!("{name} charts the reefs"),
            "personality": "precise",
            "scenario": "a survey ship",
            "first_mes": "Soundings ready.",
            "mes_example": "",
            "tags": ["sea"],
            "extensions": {}
        }
    })
    .to_string()
}

/// A `chara_card_v2` definition with lorebook entries at the given raw positions.
pub fn v2_definition_with_lorebook(name: &str, positions: &[serde_json::Value]) -> String {
    let entries: Vec<_> = positions
        .iter()
        .enumerate()
        .map(|(i, position)| {
            json!({"keys": [format!("k{i}")], "content": format!("entry {i}"), "position": position})
        })
        .collect();
    json!({
        "spec": "chara_card_v2",
        "spec_version": "2.0",
        "data": {
            "name": name,
            "description": "lore keeper",
            "character_book": {"name": "lore", "entries": entries}
        }
    })
    .to_string()
}

/// An upload of a card PNG carrying `definition`.
pub fn card_upload(file_name: &str, definition: &str) -> UploadEnvelope {
    UploadEnvelope::new(file_name, "image/png", card_png(definition)).with_last_modified(1_700_000_000_000)
}

/// Test context with a pipeline over failure-injecting stores.
pub struct TestContext {
    /// Row store wrapper.
    pub store: FailingStore,
    /// Image store wrapper.
    pub artifacts: FailingArtifactStore,
    /// Hook that records invocations.
    pub hook: Arc<RecordingHook>,
    /// Owner used by [`TestContext::ingest`].
    pub owner: OwnerId,
    /// Pipeline under test.
    pub pipeline: Arc<IngestPipeline>,
}

impl TestContext {
    /// Creates a context with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(IngestConfig::default())
    }

    /// Creates a context with the given configuration.
    #[must_use]
    pub fn with_config(config: IngestConfig) -> Self {
        let store = FailingStore::new(InMemoryStore::new());
        let artifacts = FailingArtifactStore::new();
        let hook = Arc::new(RecordingHook::new());
        let pipeline = IngestPipeline::new(
            Arc::new(store.clone()),
            Arc::new(artifacts.clone()),
            config,
        )
        .with_hook(hook.clone());
        Self {
            store,
            artifacts,
            hook,
            owner: OwnerId::generate(),
            pipeline: Arc::new(pipeline),
        }
    }

    /// Ingests `upload` as [`TestContext::owner`] with private visibility.
    ///
    /// # Errors
    ///
    /// Returns the pipeline's error.
    pub async fn ingest(&self, upload: UploadEnvelope) -> cardvault_ingest::Result<IngestionRecord> {
        self.pipeline
            .ingest(upload, self.owner, Visibility::Private)
            .await
    }

    /// The underlying in-memory row store.
    pub fn rows(&self) -> &InMemoryStore {
        self.store.inner()
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}
