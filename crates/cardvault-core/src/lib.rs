//! # cardvault-core
//!
//! Core abstractions shared by every cardvault crate.
//!
//! - **Identifiers**: Strongly-typed IDs for characters and owners
//! - **Error Types**: Shared error definitions and result types
//! - **Canonical JSON**: Deterministic encoding used for content hashing
//! - **Artifact Storage**: Key/value blob storage for rendered images
//! - **Observability**: Logging initialization and span helpers
//!
//! ## Example
//!
//! ```rust
//! use cardvault_core::prelude::*;
//!
//! let id = CharacterId::generate();
//! let digest = sha256_hex(b"hello");
//! assert_eq!(digest.len(), 64);
//! # let _ = id;
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod artifact;
pub mod canonical_json;
pub mod error;
pub mod id;
pub mod observability;

use sha2::{Digest, Sha256};

/// Returns the lowercase hex SHA-256 digest of `data`.
#[must_use]
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::artifact::{
        ArtifactStore, FsArtifactStore, MemoryArtifactStore, PutCondition, PutOutcome,
    };
    pub use crate::error::{Error, Result};
    pub use crate::id::{CharacterId, OwnerId};
    pub use crate::sha256_hex;
}

pub use artifact::{ArtifactStore, FsArtifactStore, MemoryArtifactStore, PutCondition, PutOutcome};
pub use error::{Error, Result};
pub use id::{CharacterId, OwnerId};
pub use observability::{LogFormat, Redacted, init_logging};
