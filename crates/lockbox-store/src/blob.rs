//! The blob storage boundary: external persistence the store writes through.
//!
//! Keys and values are opaque text. Every call commits atomically: a failed
//! put or remove leaves the previous state observable, never a torn one.
//! Ships an in-memory implementation for tests and embedding, and a
//! file-backed one (single JSON document, temp-file + rename on every
//! mutation) as the standalone default.

use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tempfile::NamedTempFile;

use crate::error::BlobStoreError;

/// External key-value persistence. Implementations must be safe to call from
/// multiple threads; per-call atomicity is on the implementor.
pub trait BlobStore: Send + Sync {
    /// Read one value. `None` when absent.
    fn get(&self, key: &str) -> Result<Option<String>, BlobStoreError>;

    /// Write one value, replacing any existing one.
    fn put(&self, key: &str, value: &str) -> Result<(), BlobStoreError>;

    /// Remove one value. Absent keys are a no-op.
    fn remove(&self, key: &str) -> Result<(), BlobStoreError>;

    /// Snapshot every stored pair.
    fn get_all(&self) -> Result<HashMap<String, String>, BlobStoreError>;

    /// Remove everything, including data outside any namespace.
    fn clear(&self) -> Result<(), BlobStoreError>;
}

/// Volatile blob store backed by a `HashMap`.
#[derive(Default)]
pub struct MemoryBlobStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlobStore for MemoryBlobStore {
    fn get(&self, key: &str) -> Result<Option<String>, BlobStoreError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<(), BlobStoreError> {
        self.entries
            .lock()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), BlobStoreError> {
        self.entries.lock().remove(key);
        Ok(())
    }

    fn get_all(&self) -> Result<HashMap<String, String>, BlobStoreError> {
        Ok(self.entries.lock().clone())
    }

    fn clear(&self) -> Result<(), BlobStoreError> {
        self.entries.lock().clear();
        Ok(())
    }
}

/// File-backed blob store: one JSON document, rewritten atomically on every
/// mutation (write to a temp file in the same directory, then rename).
///
/// Mutations build the next document, persist it, then swap it into memory,
/// so a failed write leaves memory matching what is on disk.
pub struct FileBlobStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileBlobStore {
    /// Open or create the document at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, BlobStoreError> {
        let path = path.into();
        let entries = match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(BlobStoreError::Io(e)),
        };
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<(), BlobStoreError> {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut file = NamedTempFile::new_in(dir)?;
        file.write_all(&serde_json::to_vec_pretty(entries)?)?;
        file.as_file().sync_all()?;
        file.persist(&self.path)
            .map_err(|e| BlobStoreError::Io(e.error))?;
        Ok(())
    }
}

impl BlobStore for FileBlobStore {
    fn get(&self, key: &str) -> Result<Option<String>, BlobStoreError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<(), BlobStoreError> {
        let mut entries = self.entries.lock();
        let mut next = entries.clone();
        next.insert(key.to_string(), value.to_string());
        self.persist(&next)?;
        *entries = next;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), BlobStoreError> {
        let mut entries = self.entries.lock();
        let mut next = entries.clone();
        if next.remove(key).is_none() {
            return Ok(());
        }
        self.persist(&next)?;
        *entries = next;
        Ok(())
    }

    fn get_all(&self) -> Result<HashMap<String, String>, BlobStoreError> {
        Ok(self
            .entries
            .lock()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn clear(&self) -> Result<(), BlobStoreError> {
        let mut entries = self.entries.lock();
        let next = BTreeMap::new();
        self.persist(&next)?;
        *entries = next;
        Ok(())
    }
}
