//! Snapshot persistence backends.
//!
//! A backend only knows how to read and write a whole [`DocumentSnapshot`];
//! locking and the read-modify-write cycle live in the document store.

use crate::error::Result;
use crate::store::snapshot::DocumentSnapshot;
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

/// Whole-snapshot load/persist primitives.
///
/// Implementations must never leave a partially written snapshot visible to
/// a later `load`.
pub trait SnapshotBackend: Send + Sync {
    /// Persist an empty snapshot if nothing is stored yet.
    ///
    /// Returns `true` if a new snapshot was written.
    fn initialize(&self) -> Result<bool>;

    /// Read the full snapshot.
    fn load(&self) -> Result<DocumentSnapshot>;

    /// Replace the stored snapshot.
    fn persist(&self, snapshot: &DocumentSnapshot) -> Result<()>;
}

/// Single JSON file, rewritten atomically on every persist.
#[derive(Debug, Clone)]
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    /// Create a backend for the file at `path`. Nothing is touched on disk.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the snapshot file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn directory(&self) -> PathBuf {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map_or_else(|| "snapshot".into(), |n| n.to_string_lossy().into_owned());
        self.directory().join(format!(".{name}.tmp"))
    }

    #[cfg(unix)]
    fn sync_directory(&self) -> Result<()> {
        File::open(self.directory())?.sync_all()?;
        Ok(())
    }

    #[cfg(not(unix))]
    fn sync_directory(&self) -> Result<()> {
        Ok(())
    }
}

impl SnapshotBackend for FileBackend {
    fn initialize(&self) -> Result<bool> {
        match fs::metadata(&self.path) {
            Ok(_) => Ok(false),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                self.persist(&DocumentSnapshot::default())?;
                Ok(true)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn load(&self) -> Result<DocumentSnapshot> {
        let data = fs::read(&self.path)?;
        Ok(serde_json::from_slice(&data)?)
    }

    fn persist(&self, snapshot: &DocumentSnapshot) -> Result<()> {
        let data = serde_json::to_vec(snapshot)?;
        let temp_path = self.temp_path();

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)?;
        file.write_all(&data)?;
        file.sync_all()?;
        drop(file);

        if let Err(e) = fs::rename(&temp_path, &self.path) {
            let _ = fs::remove_file(&temp_path);
            return Err(e.into());
        }

        self.sync_directory()
    }
}

/// In-process backend holding the encoded snapshot.
///
/// Snapshots still pass through JSON so the encoding is exercised. Writes can
/// be made to fail to test error propagation.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    data: Mutex<Option<Vec<u8>>>,
    fail_writes: AtomicBool,
}

impl MemoryBackend {
    /// Create an empty backend with nothing stored.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent persist fail with an I/O error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Raw stored bytes, if any.
    #[must_use]
    pub fn raw(&self) -> Option<Vec<u8>> {
        self.data.lock().clone()
    }
}

impl SnapshotBackend for MemoryBackend {
    fn initialize(&self) -> Result<bool> {
        if self.data.lock().is_some() {
            return Ok(false);
        }
        self.persist(&DocumentSnapshot::default())?;
        Ok(true)
    }

    fn load(&self) -> Result<DocumentSnapshot> {
        let guard = self.data.lock();
        let data = guard
            .as_deref()
            .ok_or_else(|| std::io::Error::new(ErrorKind::NotFound, "no snapshot stored"))?;
        Ok(serde_json::from_slice(data)?)
    }

    fn persist(&self, snapshot: &DocumentSnapshot) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(std::io::Error::other("injected write failure").into());
        }
        let data = serde_json::to_vec(snapshot)?;
        *self.data.lock() = Some(data);
        Ok(())
    }
}
