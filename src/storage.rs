//! Durable blob storage behind the metadata cache.
//!
//! Locations are relative paths derived from a [`CacheKey`](crate::cache::CacheKey);
//! a store decides where they live. Writes must be atomic: a reader sees either
//! the previous blob, no blob, or the complete new one.

use async_trait::async_trait;
use dashmap::DashMap;
use log::{debug, warn};
use std::io;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid storage location {}", path.display())]
    InvalidLocation { path: PathBuf },
}

#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Returns `Ok(None)` when nothing is stored at `location`.
    async fn read(&self, location: &Path) -> Result<Option<Vec<u8>>, StoreError>;

    /// Replaces the blob at `location` in one step.
    async fn write_atomic(&self, location: &Path, bytes: &[u8]) -> Result<(), StoreError>;
}

/// Stores each document as a file below `root`.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of `location` inside this store.
    pub fn resolve(&self, location: &Path) -> PathBuf {
        self.root.join(location)
    }
}

#[async_trait]
impl MetadataStore for FileStore {
    async fn read(&self, location: &Path) -> Result<Option<Vec<u8>>, StoreError> {
        let path = self.resolve(location);
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                debug!("FileStore: read {} bytes from {}", bytes.len(), path.display());
                Ok(Some(bytes))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Read { path, source }),
        }
    }

    async fn write_atomic(&self, location: &Path, bytes: &[u8]) -> Result<(), StoreError> {
        let path = self.resolve(location);
        let (parent, file_name) = match (path.parent(), path.file_name()) {
            (Some(parent), Some(file_name)) => (parent.to_path_buf(), file_name.to_string_lossy().into_owned()),
            _ => return Err(StoreError::InvalidLocation { path }),
        };

        tokio::fs::create_dir_all(&parent)
            .await
            .map_err(|source| StoreError::Write { path: parent.clone(), source })?;

        // Temp file lives next to the target so the rename never crosses filesystems
        let tmp_path = parent.join(format!(".{}.{}.tmp", file_name, Uuid::new_v4().simple()));
        if let Err(source) = write_and_sync(&tmp_path, bytes).await {
            remove_quietly(&tmp_path).await;
            return Err(StoreError::Write { path: tmp_path, source });
        }
        if let Err(source) = tokio::fs::rename(&tmp_path, &path).await {
            remove_quietly(&tmp_path).await;
            return Err(StoreError::Write { path, source });
        }

        debug!("FileStore: wrote {} bytes to {}", bytes.len(), path.display());
        Ok(())
    }
}

async fn write_and_sync(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = tokio::fs::File::create(path).await?;
    file.write_all(bytes).await?;
    file.sync_all().await
}

async fn remove_quietly(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != io::ErrorKind::NotFound {
            warn!("FileStore: could not remove temp file {}: {}", path.display(), e);
        }
    }
}

/// Process-local store. Nothing survives a restart; meant for tests and
/// short-lived tools that still want build-once semantics.
#[derive(Debug, Default)]
pub struct MemoryStore {
    blobs: DashMap<PathBuf, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, location: &Path) -> bool {
        self.blobs.contains_key(location)
    }

    pub fn get(&self, location: &Path) -> Option<Vec<u8>> {
        self.blobs.get(location).map(|blob| blob.value().clone())
    }

    /// Writes a blob directly, bypassing the cache (e.g. to seed a corrupt entry).
    pub fn insert(&self, location: impl Into<PathBuf>, bytes: Vec<u8>) {
        self.blobs.insert(location.into(), bytes);
    }

    /// Out-of-band invalidation.
    pub fn remove(&self, location: &Path) -> Option<Vec<u8>> {
        self.blobs.remove(location).map(|(_, blob)| blob)
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

#[async_trait]
impl MetadataStore for MemoryStore {
    async fn read(&self, location: &Path) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.get(location))
    }

    async fn write_atomic(&self, location: &Path, bytes: &[u8]) -> Result<(), StoreError> {
        self.blobs.insert(location.to_path_buf(), bytes.to_vec());
        Ok(())
    }
}
