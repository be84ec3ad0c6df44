//! Filesystem storage backend.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::{ensure_parent, staged_copy, validate_reference, ArtifactStore, StoreError};

/// Stores artifacts as files under `<root>/<collection>/<reference>`.
///
/// # Examples
///
/// ```
/// use tide_audit::store::{ArtifactStore, LocalStore};
///
/// let store = LocalStore::new("/var/lib/tide", "audits");
/// assert_eq!(store.kind(), "local");
/// assert_eq!(store.collection_ref(), "audits");
/// ```
#[derive(Debug, Clone)]
pub struct LocalStore {
    collection: String,
    dir: PathBuf,
}

impl LocalStore {
    /// Create a store rooted at `root` writing into `collection`.
    pub fn new(root: impl Into<PathBuf>, collection: impl Into<String>) -> Self {
        let collection = collection.into();
        let dir = root.into().join(&collection);
        Self { collection, dir }
    }

    /// Directory holding this store's objects.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn object_path(&self, reference: &str) -> Result<PathBuf, StoreError> {
        validate_reference(reference)?;
        Ok(self.dir.join(reference))
    }
}

#[async_trait]
impl ArtifactStore for LocalStore {
    fn kind(&self) -> &str {
        "local"
    }

    fn collection_ref(&self) -> &str {
        &self.collection
    }

    async fn upload(&self, local_path: &Path, reference: &str) -> Result<(), StoreError> {
        let object = self.object_path(reference)?;
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| StoreError::io(reference, e))?;

        // A missing source file is an I/O failure, not a missing object.
        if let Err(source) = tokio::fs::metadata(local_path).await {
            return Err(StoreError::Io {
                reference: reference.to_string(),
                source,
            });
        }

        staged_copy(local_path, &object)
            .await
            .map_err(|e| StoreError::io(reference, e))?;
        tracing::debug!(reference = %reference, dir = %self.dir.display(), "Stored artifact");
        Ok(())
    }

    async fn download(&self, reference: &str, local_path: &Path) -> Result<(), StoreError> {
        let object = self.object_path(reference)?;
        if !tokio::fs::try_exists(&object)
            .await
            .map_err(|e| StoreError::io(reference, e))?
        {
            return Err(StoreError::NotFound {
                reference: reference.to_string(),
            });
        }

        ensure_parent(local_path)
            .await
            .map_err(|e| StoreError::io(reference, e))?;
        staged_copy(&object, local_path)
            .await
            .map_err(|e| StoreError::io(reference, e))?;
        tracing::debug!(reference = %reference, path = %local_path.display(), "Fetched artifact");
        Ok(())
    }
}
