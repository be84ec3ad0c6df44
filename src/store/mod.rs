//! Artifact storage gateway.
//!
//! [`ArtifactStore`] is the contract the dispatcher uses to persist task
//! artifacts and to fetch source archives. Backends differ only in where
//! the bytes end up:
//!
//! - [`LocalStore`](local::LocalStore) - a directory on disk
//! - [`MemoryStore`](memory::MemoryStore) - a concurrent in-process map
//!
//! # References
//!
//! A reference is an opaque string naming one stored object. Building
//! references is the caller's concern; stores only require that a reference
//! is a single path segment (no separators, not `.` or `..`).
//!
//! # Failure scope
//!
//! Every call succeeds or fails for its own reference only. Writes stage
//! into a uniquely named `<path>.<uuid>.part` file and rename on success,
//! so a failed transfer never leaves a partial file at the destination and
//! concurrent writers to one reference never share a staging file.

pub mod local;
pub mod memory;

pub use local::LocalStore;
pub use memory::MemoryStore;

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

/// Errors raised by a storage backend for one reference.
#[derive(Error, Debug)]
pub enum StoreError {
    /// No object is stored under the reference.
    #[error("artifact not found: {reference}")]
    NotFound {
        /// The missing reference.
        reference: String,
    },

    /// Reading or writing bytes failed.
    #[error("I/O error for {reference}: {source}")]
    Io {
        /// The reference being transferred.
        reference: String,
        /// The underlying error.
        #[source]
        source: io::Error,
    },

    /// The backend refused the operation.
    #[error("storage rejected {reference}: {message}")]
    Rejected {
        /// The rejected reference.
        reference: String,
        /// Why it was rejected.
        message: String,
    },
}

impl StoreError {
    /// The reference this error is scoped to.
    pub fn reference(&self) -> &str {
        match self {
            Self::NotFound { reference }
            | Self::Io { reference, .. }
            | Self::Rejected { reference, .. } => reference,
        }
    }

    fn io(reference: &str, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            Self::NotFound {
                reference: reference.to_string(),
            }
        } else {
            Self::Io {
                reference: reference.to_string(),
                source,
            }
        }
    }
}

/// Durable storage for task artifacts and source archives.
///
/// Implementations must be `Send + Sync`: a job uploads all of its
/// artifacts concurrently through one shared store.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Short backend name (`local`, `memory`, ...). Written into the
    /// `type` of uploaded artifact details.
    fn kind(&self) -> &str;

    /// Collection the backend stores objects in. Written into the `path`
    /// of uploaded artifact details.
    fn collection_ref(&self) -> &str;

    /// Copy a local file into storage under `reference`.
    async fn upload(&self, local_path: &Path, reference: &str) -> Result<(), StoreError>;

    /// Copy the object stored under `reference` to a local file.
    async fn download(&self, reference: &str, local_path: &Path) -> Result<(), StoreError>;
}

/// Rejects references that are not a single plain path segment.
pub(crate) fn validate_reference(reference: &str) -> Result<(), StoreError> {
    let invalid = reference.is_empty()
        || reference == "."
        || reference == ".."
        || reference.contains(['/', '\\']);
    if invalid {
        return Err(StoreError::Rejected {
            reference: reference.to_string(),
            message: "reference must be a single path segment".to_string(),
        });
    }
    Ok(())
}

fn staging_path(destination: &Path) -> PathBuf {
    let mut staged = OsString::from(destination.as_os_str());
    staged.push(format!(".{}.part", Uuid::new_v4().simple()));
    PathBuf::from(staged)
}

/// Writes `bytes` to `destination` via a staging file.
pub(crate) async fn staged_write(destination: &Path, bytes: &[u8]) -> io::Result<()> {
    let staging = staging_path(destination);
    let result = async {
        tokio::fs::write(&staging, bytes).await?;
        tokio::fs::rename(&staging, destination).await
    }
    .await;
    if result.is_err() {
        let _ = tokio::fs::remove_file(&staging).await;
    }
    result
}

/// Copies `source` to `destination` via a staging file.
pub(crate) async fn staged_copy(source: &Path, destination: &Path) -> io::Result<()> {
    let staging = staging_path(destination);
    let result = async {
        tokio::fs::copy(source, &staging).await?;
        tokio::fs::rename(&staging, destination).await
    }
    .await;
    if result.is_err() {
        let _ = tokio::fs::remove_file(&staging).await;
    }
    result
}

/// Creates the parent directory of `path` when it has one.
pub(crate) async fn ensure_parent(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => tokio::fs::create_dir_all(parent).await,
        _ => Ok(()),
    }
}
