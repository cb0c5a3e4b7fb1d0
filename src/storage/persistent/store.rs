//! WAL-backed store implementation.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use chrono::Utc;

use crate::domain::Domain;
use crate::entity::{CanonicalEntity, CanonicalEntityId};
use crate::record::{AttributeRecord, NewRecord};
use crate::storage::scope::{ChangeSink, DomainChangeSet, StagedScope};
use crate::storage::state::StoreState;
use crate::storage::traits::{CanonStore, DomainScope, StorageError};

use super::file_lock::DirLock;
use super::snapshot::{self, Snapshot};
use super::wal::{WalEntryKind, WriteAheadLog};
use super::PersistentConfig;

const WAL_FILE: &str = "canon.wal";
const SNAPSHOT_FILE: &str = "snapshot.pcan";

fn lock_err(context: &'static str) -> StorageError {
    StorageError::Backend(format!("poisoned lock: {context}"))
}

fn io_err(context: &str, e: &std::io::Error) -> StorageError {
    StorageError::Backend(format!("{context}: {e}"))
}

/// Durable single-owner store.
#[derive(Debug)]
pub struct PersistentStore {
    dir: PathBuf,
    _lock: DirLock,
    wal: WriteAheadLog,
    state: RwLock<StoreState>,
    config: PersistentConfig,
}

impl PersistentStore {
    /// Opens or creates a store directory, replaying its WAL.
    ///
    /// # Errors
    /// See [`super::open_store`].
    pub fn open(dir: &Path, config: PersistentConfig) -> Result<Self, StorageError> {
        let config = config.validate()?;
        fs::create_dir_all(dir).map_err(|e| io_err("failed to create store directory", &e))?;
        let lock = DirLock::acquire(dir).map_err(|e| io_err("failed to acquire lock", &e))?;

        let (mut state, covered) = match snapshot::load(&dir.join(SNAPSHOT_FILE))
            .map_err(|e| io_err("failed to load snapshot", &e))?
        {
            Some(snap) => (StoreState::from_image(snap.state), snap.wal_sequence),
            None => (StoreState::default(), 0),
        };

        let (wal, entries) = WriteAheadLog::open(&dir.join(WAL_FILE), config.sync_on_write)
            .map_err(|e| io_err("failed to open WAL", &e))?;
        wal.advance_sequence(covered)
            .map_err(|e| io_err("failed to open WAL", &e))?;

        let mut replayed = 0usize;
        for entry in entries.into_iter().filter(|e| e.sequence > covered) {
            let sequence = entry.sequence;
            let applied = match entry.kind {
                WalEntryKind::RecordInsert(record) => state.insert_record(record),
                WalEntryKind::DomainCommit(changes) => state.apply(&changes),
                WalEntryKind::EntityRetire { domain, id } => state.retire(domain, id).map(|_| ()),
            };
            applied.map_err(|e| {
                StorageError::Backend(format!("failed to replay WAL entry {sequence}: {e}"))
            })?;
            replayed += 1;
        }

        tracing::info!(
            dir = %dir.display(),
            snapshot_sequence = covered,
            replayed,
            "opened persistent store"
        );

        Ok(Self {
            dir: dir.to_path_buf(),
            _lock: lock,
            wal,
            state: RwLock::new(state),
            config,
        })
    }

    /// The store directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Sequence number of the last logged mutation.
    ///
    /// # Errors
    /// Returns an error if the WAL lock is poisoned.
    pub fn wal_sequence(&self) -> Result<u64, StorageError> {
        self.wal.sequence().map_err(|e| io_err("failed to read WAL", &e))
    }

    /// Writes a snapshot of the full state and empties the WAL.
    ///
    /// # Errors
    /// Returns an error if the snapshot cannot be written. The WAL is left
    /// untouched in that case.
    pub fn compact(&self) -> Result<(), StorageError> {
        // Writers are held off so nothing lands between snapshot and reset.
        let state = self.state.write().map_err(|_| lock_err("persistent.compact"))?;
        let snap = Snapshot {
            wal_sequence: self.wal_sequence()?,
            taken_at: Utc::now(),
            state: state.to_image(),
        };
        snapshot::store(&self.dir.join(SNAPSHOT_FILE), &snap)
            .map_err(|e| io_err("failed to write snapshot", &e))?;
        self.wal.reset().map_err(|e| io_err("failed to reset WAL", &e))?;
        tracing::info!(wal_sequence = snap.wal_sequence, "compacted persistent store");
        Ok(())
    }

    fn log(&self, kind: WalEntryKind) -> Result<u64, StorageError> {
        self.wal
            .append(kind)
            .map_err(|e| io_err("failed to append to WAL", &e))
    }

    fn maybe_compact(&self) {
        let size = match self.wal.size_bytes() {
            Ok(size) => size,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read WAL size");
                return;
            }
        };
        if size <= self.config.max_wal_size {
            return;
        }
        // The triggering write is already durable; a failed compaction only
        // postpones the next one.
        if let Err(e) = self.compact() {
            tracing::warn!(error = %e, "automatic compaction failed");
        }
    }
}

impl ChangeSink for PersistentStore {
    fn publish(&self, changes: DomainChangeSet) -> Result<(), StorageError> {
        {
            let mut state = self.state.write().map_err(|_| lock_err("persistent.publish"))?;
            state.check(&changes)?;
            let sequence = self.log(WalEntryKind::DomainCommit(changes.clone()))?;
            state.apply(&changes)?;
            tracing::debug!(domain = %changes.domain, sequence, "logged domain commit");
        }
        self.maybe_compact();
        Ok(())
    }
}

impl CanonStore for PersistentStore {
    fn insert_record(&self, record: NewRecord) -> Result<AttributeRecord, StorageError> {
        let record = {
            let mut state = self
                .state
                .write()
                .map_err(|_| lock_err("persistent.insert_record"))?;
            let record = state.allocate_record(record);
            self.log(WalEntryKind::RecordInsert(record.clone()))?;
            state.insert_record(record.clone())?;
            record
        };
        self.maybe_compact();
        Ok(record)
    }

    fn records(&self, domain: Domain) -> Result<Vec<AttributeRecord>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("persistent.records"))?;
        Ok(state.records(domain))
    }

    fn entities(&self, domain: Domain) -> Result<Vec<CanonicalEntity>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("persistent.entities"))?;
        Ok(state.entities(domain))
    }

    fn begin(&self, domain: Domain) -> Result<Box<dyn DomainScope + '_>, StorageError> {
        let snapshot = self
            .state
            .read()
            .map_err(|_| lock_err("persistent.begin"))?
            .snapshot(domain);
        Ok(Box::new(StagedScope::new(self, domain, snapshot)))
    }

    fn retire_entity(
        &self,
        domain: Domain,
        id: CanonicalEntityId,
    ) -> Result<CanonicalEntity, StorageError> {
        let retired = {
            let mut state = self.state.write().map_err(|_| lock_err("persistent.retire"))?;
            if !state.entities(domain).iter().any(|e| e.id == id) {
                return Err(StorageError::EntityNotFound { domain, id });
            }
            self.log(WalEntryKind::EntityRetire { domain, id })?;
            state.retire(domain, id)?
        };
        tracing::info!(%domain, %id, name = %retired.canonical_name, "retired canonical entity");
        self.maybe_compact();
        Ok(retired)
    }
}
