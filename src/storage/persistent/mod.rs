//! Persistent storage backend.
//!
//! A store directory holds:
//! - `canon.lock`: exclusive lock, one owner per directory
//! - `canon.wal`: write-ahead log of every mutation since the last snapshot
//! - `snapshot.pcan`: compacted full state
//!
//! Opening a store loads the snapshot and replays the WAL entries it does
//! not cover. Compaction writes a fresh snapshot and empties the WAL.

mod codec;
mod file_lock;
mod snapshot;
mod store;
mod wal;

pub use file_lock::DirLock;
pub use store::PersistentStore;
pub use wal::{WalEntry, WalEntryKind, WriteAheadLog};

use std::path::Path;

use crate::storage::traits::StorageError;

/// Configuration for persistent storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistentConfig {
    /// Whether to fsync after every WAL append (slower but durable).
    pub sync_on_write: bool,
    /// WAL size that triggers compaction after a write (bytes).
    pub max_wal_size: u64,
}

impl Default for PersistentConfig {
    fn default() -> Self {
        Self {
            sync_on_write: true,
            max_wal_size: 64 * 1024 * 1024, // 64 MB
        }
    }
}

impl PersistentConfig {
    const MIN_WAL_SIZE: u64 = 4 * 1024;

    /// Checks the configuration.
    ///
    /// # Errors
    /// [`StorageError::Config`] if `max_wal_size` is below 4 KiB.
    pub fn validate(self) -> Result<Self, StorageError> {
        if self.max_wal_size < Self::MIN_WAL_SIZE {
            return Err(StorageError::Config(format!(
                "max_wal_size must be at least {} bytes (got {})",
                Self::MIN_WAL_SIZE,
                self.max_wal_size
            )));
        }
        Ok(self)
    }
}

/// Open or create a persistent store at the given directory.
///
/// # Errors
/// - If the configuration fails [`PersistentConfig::validate`]
/// - If the directory cannot be created or accessed
/// - If another owner holds the lock
/// - If the snapshot is corrupt or WAL replay fails
///
/// # Example
/// ```rust,no_run
/// use pharmacanon::storage::open_store;
///
/// let store = open_store("./drugs.canon", None)?;
/// # Ok::<(), pharmacanon::StorageError>(())
/// ```
pub fn open_store(
    path: impl AsRef<Path>,
    config: Option<PersistentConfig>,
) -> Result<PersistentStore, StorageError> {
    PersistentStore::open(path.as_ref(), config.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_validation() {
        assert!(PersistentConfig::default().validate().is_ok());
        let err = PersistentConfig {
            max_wal_size: 100,
            ..PersistentConfig::default()
        }
        .validate()
        .unwrap_err();
        assert!(matches!(err, StorageError::Config(_)));
    }
}
