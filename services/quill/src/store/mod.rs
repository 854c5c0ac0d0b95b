//! Snapshot persistence: record types, backends and the locked store.

pub mod backend;
pub mod document;
pub mod snapshot;

pub use backend::{FileBackend, MemoryBackend, SnapshotBackend};
pub use document::DocumentStore;
pub use snapshot::{Account, DocumentSnapshot, Post, RecordId, SnapshotStats};
