//! In-memory storage backend.
//!
//! [`MemoryStore`] keeps objects in a [`DashMap`], so concurrent uploads
//! for different references only contend at shard level. Useful for tests
//! and single-process deployments where artifacts need not outlive the
//! process.

use std::path::Path;

use async_trait::async_trait;
use dashmap::DashMap;

use super::{ensure_parent, staged_write, validate_reference, ArtifactStore, StoreError};

/// Thread-safe in-memory artifact store.
///
/// # Examples
///
/// ```
/// use tide_audit::store::{ArtifactStore, MemoryStore};
///
/// let store = MemoryStore::new();
/// store.put("source.zip", b"PK".to_vec());
/// assert!(store.contains("source.zip"));
/// assert_eq!(store.kind(), "memory");
/// ```
#[derive(Debug)]
pub struct MemoryStore {
    collection: String,
    objects: DashMap<String, Vec<u8>>,
}

impl MemoryStore {
    /// Create an empty store with the default `memory` collection.
    pub fn new() -> Self {
        Self::with_collection("memory")
    }

    /// Create an empty store with a named collection.
    pub fn with_collection(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            objects: DashMap::new(),
        }
    }

    /// Store bytes directly under a reference.
    pub fn put(&self, reference: impl Into<String>, bytes: Vec<u8>) {
        self.objects.insert(reference.into(), bytes);
    }

    /// Bytes stored under a reference.
    pub fn get(&self, reference: &str) -> Option<Vec<u8>> {
        self.objects.get(reference).map(|entry| entry.value().clone())
    }

    /// Whether a reference is stored.
    pub fn contains(&self, reference: &str) -> bool {
        self.objects.contains_key(reference)
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ArtifactStore for MemoryStore {
    fn kind(&self) -> &str {
        "memory"
    }

    fn collection_ref(&self) -> &str {
        &self.collection
    }

    async fn upload(&self, local_path: &Path, reference: &str) -> Result<(), StoreError> {
        validate_reference(reference)?;
        let bytes = tokio::fs::read(local_path)
            .await
            .map_err(|source| StoreError::Io {
                reference: reference.to_string(),
                source,
            })?;
        self.objects.insert(reference.to_string(), bytes);
        Ok(())
    }

    async fn download(&self, reference: &str, local_path: &Path) -> Result<(), StoreError> {
        validate_reference(reference)?;
        let bytes = self.get(reference).ok_or_else(|| StoreError::NotFound {
            reference: reference.to_string(),
        })?;
        ensure_parent(local_path)
            .await
            .map_err(|e| StoreError::io(reference, e))?;
        staged_write(local_path, &bytes)
            .await
            .map_err(|e| StoreError::io(reference, e))
    }
}
