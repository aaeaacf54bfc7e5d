//! Artifact storage for rendered character images.
//!
//! The ingestion pipeline stores one clean image per character, keyed by the
//! character identity. This module defines the storage contract and two
//! backends:
//!
//! - [`MemoryArtifactStore`]: thread-safe in-memory map for tests
//! - [`FsArtifactStore`]: files under a root directory, one file per key
//!
//! Keys are `/`-separated relative paths such as `images/01HZX....png`.
//! Writes accept a [`PutCondition`] so callers can refuse to clobber an
//! existing object.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::error::{Error, Result};

/// Precondition for conditional writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PutCondition {
    /// Write only if the key does not exist.
    DoesNotExist,
    /// Write unconditionally.
    None,
}

/// Result of a conditional write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PutOutcome {
    /// Write succeeded, returns the new version token.
    Written {
        /// The new version token after the write.
        version: String,
    },
    /// Precondition failed, returns the current version token.
    PreconditionFailed {
        /// The version that caused the precondition to fail.
        current_version: String,
    },
}

impl PutOutcome {
    /// Returns true if the write was applied.
    #[must_use]
    pub const fn is_written(&self) -> bool {
        matches!(self, Self::Written { .. })
    }
}

/// Durable key/value storage for image bytes.
#[async_trait]
pub trait ArtifactStore: Send + Sync + 'static {
    /// Reads an entire artifact.
    ///
    /// Returns `Error::NotFound` if the key doesn't exist.
    async fn get(&self, key: &str) -> Result<Bytes>;

    /// Writes an artifact with an optional precondition.
    ///
    /// A failed precondition is a normal result, not an error.
    async fn put(&self, key: &str, data: Bytes, condition: PutCondition) -> Result<PutOutcome>;

    /// Deletes an artifact.
    ///
    /// Succeeds even if the key doesn't exist (idempotent).
    async fn delete(&self, key: &str) -> Result<()>;
}

/// In-memory artifact store for testing.
///
/// Uses numeric versions internally (exposed as strings).
#[derive(Debug, Default, Clone)]
pub struct MemoryArtifactStore {
    objects: Arc<RwLock<HashMap<String, StoredArtifact>>>,
}

#[derive(Debug, Clone)]
struct StoredArtifact {
    data: Bytes,
    version: u64,
}

fn poisoned() -> Error {
    Error::Internal {
        message: "lock poisoned".into(),
    }
}

impl MemoryArtifactStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all stored keys, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn keys(&self) -> Result<Vec<String>> {
        let objects = self.objects.read().map_err(|_| poisoned())?;
        let mut keys: Vec<String> = objects.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    async fn get(&self, key: &str) -> Result<Bytes> {
        let objects = self.objects.read().map_err(|_| poisoned())?;
        objects
            .get(key)
            .map(|o| o.data.clone())
            .ok_or_else(|| Error::NotFound(format!("artifact not found: {key}")))
    }

    async fn put(&self, key: &str, data: Bytes, condition: PutCondition) -> Result<PutOutcome> {
        let mut objects = self.objects.write().map_err(|_| poisoned())?;
        let current = objects.get(key);

        if let (PutCondition::DoesNotExist, Some(obj)) = (&condition, current) {
            return Ok(PutOutcome::PreconditionFailed {
                current_version: obj.version.to_string(),
            });
        }

        let version = current.map_or(1, |o| o.version + 1);
        objects.insert(key.to_string(), StoredArtifact { data, version });
        drop(objects);

        Ok(PutOutcome::Written {
            version: version.to_string(),
        })
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.objects.write().map_err(|_| poisoned())?.remove(key);
        Ok(())
    }
}

/// Filesystem artifact store.
///
/// Each key maps to a file below `root`. Versions are the SHA-256 of the file
/// content. Conditional writes are check-then-write and are not atomic across processes.
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    /// Creates a store rooted at `root`. The directory is created lazily.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        let safe = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(Error::InvalidInput(format!("invalid artifact key: {key:?}")));
        }
        Ok(self.root.join(relative))
    }

    async fn read_optional(path: &Path) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::storage_with_source(
                format!("failed to read {}", path.display()),
                e,
            )),
        }
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn get(&self, key: &str) -> Result<Bytes> {
        let path = self.resolve(key)?;
        Self::read_optional(&path)
            .await?
            .map(Bytes::from)
            .ok_or_else(|| Error::NotFound(format!("artifact not found: {key}")))
    }

    async fn put(&self, key: &str, data: Bytes, condition: PutCondition) -> Result<PutOutcome> {
        let path = self.resolve(key)?;
        let current = Self::read_optional(&path).await?;

        if let (PutCondition::DoesNotExist, Some(existing)) = (&condition, &current) {
            return Ok(PutOutcome::PreconditionFailed {
                current_version: crate::sha256_hex(existing),
            });
        }

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                Error::storage_with_source(format!("failed to create {}", parent.display()), e)
            })?;
        }

        // Write to a sibling temp file and rename so readers never see a torn image.
        let tmp = path.with_extension("partial");
        tokio::fs::write(&tmp, &data).await.map_err(|e| {
            Error::storage_with_source(format!("failed to write {}", tmp.display()), e)
        })?;
        tokio::fs::rename(&tmp, &path).await.map_err(|e| {
            Error::storage_with_source(format!("failed to publish {}", path.display()), e)
        })?;

        Ok(PutOutcome::Written {
            version: crate::sha256_hex(&data),
        })
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.resolve(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::storage_with_source(
                format!("failed to delete {}", path.display()),
                e,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_roundtrip() {
        let store = MemoryArtifactStore::new();
        let data = Bytes::from_static(b"\x89PNG fake");

        let outcome = store
            .put("images/a.png", data.clone(), PutCondition::None)
            .await
            .expect("put should succeed");
        assert!(matches!(outcome, PutOutcome::Written { ref version } if version == "1"));

        let retrieved = store.get("images/a.png").await.expect("get should succeed");
        assert_eq!(retrieved, data);
        assert_eq!(store.keys().unwrap(), vec!["images/a.png".to_string()]);
    }

    #[tokio::test]
    async fn memory_store_does_not_exist_precondition() {
        let store = MemoryArtifactStore::new();
        let first = store
            .put("k", Bytes::from("v1"), PutCondition::DoesNotExist)
            .await
            .unwrap();
        assert!(first.is_written());

        let second = store
            .put("k", Bytes::from("v2"), PutCondition::DoesNotExist)
            .await
            .unwrap();
        assert!(matches!(second, PutOutcome::PreconditionFailed { .. }));
        assert_eq!(store.get("k").await.unwrap(), Bytes::from("v1"));
    }

    #[tokio::test]
    async fn memory_store_unconditional_put_overwrites() {
        let store = MemoryArtifactStore::new();
        store.put("k", Bytes::from("v1"), PutCondition::None).await.unwrap();
        let second = store.put("k", Bytes::from("v2"), PutCondition::None).await.unwrap();
        assert!(matches!(second, PutOutcome::Written { ref version } if version == "2"));
        assert_eq!(store.get("k").await.unwrap(), Bytes::from("v2"));
    }

    #[tokio::test]
    async fn memory_store_delete_is_idempotent() {
        let store = MemoryArtifactStore::new();
        store.put("k", Bytes::from("v"), PutCondition::None).await.unwrap();
        store.delete("k").await.unwrap();
        store.delete("k").await.unwrap();
        assert!(store.get("k").await.unwrap_err().is_not_found());
        assert!(store.keys().unwrap().is_empty());
    }

    #[tokio::test]
    async fn fs_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsArtifactStore::new(dir.path());
        let data = Bytes::from_static(b"image-bytes");

        let outcome = store
            .put("images/x.png", data.clone(), PutCondition::DoesNotExist)
            .await
            .unwrap();
        let PutOutcome::Written { version } = outcome else {
            panic!("expected write");
        };
        assert_eq!(version, crate::sha256_hex(&data));

        assert_eq!(store.get("images/x.png").await.unwrap(), data);
        assert!(!dir.path().join("images/x.partial").exists());

        let again = store
            .put("images/x.png", Bytes::from("other"), PutCondition::DoesNotExist)
            .await
            .unwrap();
        assert!(!again.is_written());
    }

    #[tokio::test]
    async fn fs_store_delete_missing_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsArtifactStore::new(dir.path());
        store.delete("images/missing.png").await.unwrap();
        assert!(store.get("images/missing.png").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn fs_store_rejects_escaping_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsArtifactStore::new(dir.path());
        for key in ["../escape.png", "/abs.png", "", "a/../../b"] {
            let err = store.get(key).await.unwrap_err();
            assert!(matches!(err, Error::InvalidInput(_)), "key {key:?}: {err}");
        }
    }
}
