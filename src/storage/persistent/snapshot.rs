//! Snapshot files.
//!
//! A snapshot is the full store state plus the WAL sequence it covers.
//! It is written to a temporary file, fsynced and renamed into place, so a
//! reader sees either the previous snapshot or the new one.

use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, ErrorKind, Result as IoResult, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::state::StateImage;

use super::codec;

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Snapshot {
    /// Every WAL entry up to and including this sequence is reflected.
    pub(crate) wal_sequence: u64,
    pub(crate) taken_at: DateTime<Utc>,
    pub(crate) state: StateImage,
}

/// Loads the snapshot at `path`, if there is one.
pub(crate) fn load(path: &Path) -> IoResult<Option<Snapshot>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };
    let mut reader = BufReader::new(file);
    codec::read_header(&mut reader)?;
    codec::decode(&mut reader).map(Some)
}

/// Atomically replaces the snapshot at `path`.
pub(crate) fn store(path: &Path, snapshot: &Snapshot) -> IoResult<()> {
    let tmp = path.with_extension("tmp");
    {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&tmp)?;
        codec::write_header(&mut file)?;
        file.write_all(&codec::encode(snapshot)?)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    sync_parent(path)
}

#[cfg(unix)]
fn sync_parent(path: &Path) -> IoResult<()> {
    match path.parent() {
        Some(dir) => File::open(dir)?.sync_all(),
        None => Ok(()),
    }
}

#[cfg(not(unix))]
fn sync_parent(_path: &Path) -> IoResult<()> {
    Ok(())
}
