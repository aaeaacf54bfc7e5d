//! # cardvault-ingest
//!
//! Ingestion of character cards into durable storage.
//!
//! - **Pipeline** ([`pipeline`]): decode, normalize, dedup, persist, compensate
//! - **Store** ([`store`]): transactional row store with uniqueness constraints
//! - **Handles** ([`pool`]): per-character serialization of updates
//! - **Hooks** ([`hook`]): best-effort post-commit artifact generation
//! - **Configuration** ([`config`]) and **metrics** ([`metrics`])
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use cardvault_core::MemoryArtifactStore;
//! use cardvault_ingest::config::IngestConfig;
//! use cardvault_ingest::pipeline::IngestPipeline;
//! use cardvault_ingest::store::InMemoryStore;
//!
//! let pipeline = IngestPipeline::new(
//!     Arc::new(InMemoryStore::new()),
//!     Arc::new(MemoryArtifactStore::new()),
//!     IngestConfig::default(),
//! );
//! assert_eq!(pipeline.config().image_key("01J"), "images/01J.png");
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod hook;
pub mod metrics;
pub mod pipeline;
pub mod pool;
pub mod record;
pub mod store;
pub mod tokenizer;

pub use config::IngestConfig;
pub use error::{ArtifactHookError, DuplicateKind, IngestionError, Result};
pub use hook::{ArtifactHook, NoopHook};
pub use pipeline::{DefinitionSource, IngestPipeline, Stage};
pub use record::{CharacterRow, DefinitionRow, IngestionRecord, OriginalRow, Visibility};
pub use store::{CharacterStore, InMemoryStore, StoreError, StoreTransaction};
pub use tokenizer::{
    BpeTokenizer, HeuristicTokenizer, TokenMetrics, Tokenizer, default_tokenizer,
};
