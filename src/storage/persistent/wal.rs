//! Write-ahead log.
//!
//! Every mutation of a persistent store is appended here (and optionally
//! fsynced) before it is applied in memory. One committed domain scope is one
//! entry, so replay can never observe half of a domain's canonicalization.
//!
//! # File Format
//! ```text
//! [MAGIC: 4 bytes][VERSION: 1 byte]
//! [FRAME 1: codec-encoded WalEntry]
//! [FRAME 2: codec-encoded WalEntry]
//! ...
//! ```
//!
//! A torn or corrupt tail is cut off when the log is opened.

use std::fs::{File, OpenOptions};
use std::io::{BufReader, Error as IoError, ErrorKind, Result as IoResult, Seek, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::Domain;
use crate::entity::CanonicalEntityId;
use crate::record::AttributeRecord;
use crate::storage::scope::DomainChangeSet;

use super::codec;

/// A single entry in the write-ahead log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalEntry {
    /// Monotonically increasing sequence number.
    pub sequence: u64,
    /// When this entry was written.
    pub timestamp: DateTime<Utc>,
    /// The logged mutation.
    pub kind: WalEntryKind,
}

/// The mutation carried by a WAL entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum WalEntryKind {
    RecordInsert(AttributeRecord),
    DomainCommit(DomainChangeSet),
    EntityRetire {
        domain: Domain,
        id: CanonicalEntityId,
    },
}

#[derive(Debug)]
struct WalInner {
    file: File,
    len: u64,
    sequence: u64,
}

/// Append-only log with checksummed frames.
#[derive(Debug)]
pub struct WriteAheadLog {
    path: PathBuf,
    inner: Mutex<WalInner>,
    sync_on_write: bool,
}

fn poisoned() -> IoError {
    IoError::new(ErrorKind::Other, "poisoned lock: wal")
}

impl WriteAheadLog {
    /// Opens or creates the log and returns every intact entry for replay.
    ///
    /// If the file ends in a partial or corrupt frame, it is truncated back
    /// to the last intact one.
    pub fn open(path: &Path, sync_on_write: bool) -> IoResult<(Self, Vec<WalEntry>)> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        let file_len = file.metadata()?.len();

        let (entries, valid_len) = if file_len < codec::HEADER_LEN {
            file.set_len(0)?;
            codec::write_header(&mut file)?;
            file.sync_all()?;
            (Vec::new(), codec::HEADER_LEN)
        } else {
            Self::read_entries(path, file_len)?
        };

        if valid_len < file_len {
            tracing::warn!(
                path = %path.display(),
                kept_bytes = valid_len,
                dropped_bytes = file_len - valid_len,
                "truncating damaged WAL tail"
            );
            file.set_len(valid_len)?;
            file.sync_all()?;
        }

        let sequence = entries.last().map_or(0, |e| e.sequence);
        // Writes go to the end regardless of the cursor left by the reads above.
        let file = OpenOptions::new().append(true).open(path)?;

        Ok((
            Self {
                path: path.to_path_buf(),
                inner: Mutex::new(WalInner {
                    file,
                    len: valid_len,
                    sequence,
                }),
                sync_on_write,
            },
            entries,
        ))
    }

    fn read_entries(path: &Path, file_len: u64) -> IoResult<(Vec<WalEntry>, u64)> {
        let mut reader = BufReader::new(File::open(path)?);
        codec::read_header(&mut reader)?;

        let mut entries = Vec::new();
        let mut valid_len = codec::HEADER_LEN;
        while valid_len < file_len {
            match codec::decode::<WalEntry>(&mut reader) {
                Ok(entry) => {
                    entries.push(entry);
                    valid_len = reader.stream_position()?;
                }
                Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                    tracing::warn!(path = %path.display(), "WAL ends in a partial entry");
                    break;
                }
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        after_sequence = entries.last().map_or(0, |last: &WalEntry| last.sequence),
                        error = %e,
                        "WAL corruption detected; later entries are discarded"
                    );
                    break;
                }
            }
        }
        Ok((entries, valid_len))
    }

    /// Appends an entry and returns its sequence number.
    ///
    /// On failure the file is cut back to its previous length so later
    /// appends never land behind a partial frame.
    pub fn append(&self, kind: WalEntryKind) -> IoResult<u64> {
        let mut inner = self.inner.lock().map_err(|_| poisoned())?;
        let sequence = inner.sequence + 1;
        let entry = WalEntry {
            sequence,
            timestamp: Utc::now(),
            kind,
        };
        let frame = codec::encode(&entry)?;

        let written = inner.file.write_all(&frame).and_then(|()| {
            if self.sync_on_write {
                inner.file.sync_data()
            } else {
                Ok(())
            }
        });
        if let Err(e) = written {
            let len = inner.len;
            if let Err(undo) = inner.file.set_len(len) {
                tracing::warn!(error = %undo, "failed to cut back WAL after a failed append");
            }
            return Err(e);
        }

        inner.len += frame.len() as u64;
        inner.sequence = sequence;
        Ok(sequence)
    }

    /// Sequence number of the last appended entry.
    pub fn sequence(&self) -> IoResult<u64> {
        Ok(self.inner.lock().map_err(|_| poisoned())?.sequence)
    }

    /// Makes sure the next entry gets a sequence number above `floor`.
    pub fn advance_sequence(&self, floor: u64) -> IoResult<()> {
        let mut inner = self.inner.lock().map_err(|_| poisoned())?;
        inner.sequence = inner.sequence.max(floor);
        Ok(())
    }

    /// Current file size in bytes.
    pub fn size_bytes(&self) -> IoResult<u64> {
        Ok(self.inner.lock().map_err(|_| poisoned())?.len)
    }

    /// Drops every entry, keeping the header and the sequence counter.
    ///
    /// Only call this once the entries are covered by a durable snapshot.
    pub fn reset(&self) -> IoResult<()> {
        let mut inner = self.inner.lock().map_err(|_| poisoned())?;
        inner.file.set_len(codec::HEADER_LEN)?;
        inner.file.sync_all()?;
        inner.len = codec::HEADER_LEN;
        Ok(())
    }

    /// Path of the log file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}
