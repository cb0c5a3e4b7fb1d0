//! Staged domain scopes.
//!
//! A [`StagedScope`] copies one domain's committed state when it is opened,
//! records every write as a pending change and hands the whole
//! [`DomainChangeSet`] to its backend on commit. Both built-in backends use
//! it; only the way a change set is made durable differs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::Domain;
use crate::entity::{CanonicalEntity, CanonicalEntityId};
use crate::record::{AttributeRecord, RecordId};
use crate::storage::traits::{CanonStore, DomainScope, StorageError};

/// A pending canonical-value rewrite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalUpdate {
    /// Record to rewrite.
    pub id: RecordId,
    /// New canonical value.
    pub canonical_value: String,
}

/// Everything a scope wants to publish for one domain, applied as a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainChangeSet {
    /// Domain every change belongs to.
    pub domain: Domain,
    /// Canonical-value rewrites, by record id.
    pub canonical_updates: Vec<CanonicalUpdate>,
    /// Entities to create, in id order.
    pub new_entities: Vec<CanonicalEntity>,
}

impl DomainChangeSet {
    /// Returns true if publishing this change set would change nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.canonical_updates.is_empty() && self.new_entities.is_empty()
    }
}

/// Committed state of one domain, as seen when a scope opens.
#[derive(Debug, Clone)]
pub(crate) struct DomainSnapshot {
    pub(crate) records: BTreeMap<RecordId, AttributeRecord>,
    pub(crate) entities: Vec<CanonicalEntity>,
    pub(crate) next_entity_id: CanonicalEntityId,
}

/// Backend side of a staged scope.
pub(crate) trait ChangeSink: Send + Sync {
    /// Makes a change set visible (and durable, if the backend is). Must
    /// apply all of it or none of it.
    fn publish(&self, changes: DomainChangeSet) -> Result<(), StorageError>;
}

pub(crate) struct StagedScope<'a> {
    sink: &'a dyn ChangeSink,
    domain: Domain,
    records: BTreeMap<RecordId, AttributeRecord>,
    entities: Vec<CanonicalEntity>,
    next_entity_id: CanonicalEntityId,
    updates: BTreeMap<RecordId, String>,
    inserted: Vec<CanonicalEntity>,
    finished: bool,
}

impl<'a> StagedScope<'a> {
    pub(crate) fn new(sink: &'a dyn ChangeSink, domain: Domain, snapshot: DomainSnapshot) -> Self {
        Self {
            sink,
            domain,
            records: snapshot.records,
            entities: snapshot.entities,
            next_entity_id: snapshot.next_entity_id,
            updates: BTreeMap::new(),
            inserted: Vec::new(),
            finished: false,
        }
    }

    fn take_changes(&mut self) -> DomainChangeSet {
        DomainChangeSet {
            domain: self.domain,
            canonical_updates: std::mem::take(&mut self.updates)
                .into_iter()
                .map(|(id, canonical_value)| CanonicalUpdate { id, canonical_value })
                .collect(),
            new_entities: std::mem::take(&mut self.inserted),
        }
    }
}

impl DomainScope for StagedScope<'_> {
    fn domain(&self) -> Domain {
        self.domain
    }

    fn records(&self) -> Result<Vec<AttributeRecord>, StorageError> {
        Ok(self.records.values().cloned().collect())
    }

    fn set_canonical_value(&mut self, id: RecordId, value: String) -> Result<(), StorageError> {
        let record = self
            .records
            .get_mut(&id)
            .ok_or(StorageError::RecordNotFound(id))?;
        record.canonical_value = Some(value.clone());
        self.updates.insert(id, value);
        Ok(())
    }

    fn entities(&self) -> Result<Vec<CanonicalEntity>, StorageError> {
        Ok(self
            .entities
            .iter()
            .chain(self.inserted.iter())
            .cloned()
            .collect())
    }

    fn insert_entity(&mut self, canonical_name: &str) -> Result<CanonicalEntity, StorageError> {
        if self
            .entities
            .iter()
            .chain(self.inserted.iter())
            .any(|e| e.canonical_name == canonical_name)
        {
            return Err(StorageError::DuplicateEntity {
                domain: self.domain,
                name: canonical_name.to_string(),
            });
        }
        let entity = CanonicalEntity::new(self.next_entity_id, self.domain, canonical_name);
        self.next_entity_id = self.next_entity_id.next();
        self.inserted.push(entity.clone());
        Ok(entity)
    }

    fn commit(mut self: Box<Self>) -> Result<(), StorageError> {
        self.finished = true;
        let changes = self.take_changes();
        if changes.is_empty() {
            return Ok(());
        }
        tracing::debug!(
            domain = %changes.domain,
            updates = changes.canonical_updates.len(),
            new_entities = changes.new_entities.len(),
            "committing domain scope"
        );
        self.sink.publish(changes)
    }

    fn rollback(mut self: Box<Self>) {
        self.finished = true;
        tracing::debug!(
            domain = %self.domain,
            updates = self.updates.len(),
            new_entities = self.inserted.len(),
            "rolled back domain scope"
        );
    }
}

impl Drop for StagedScope<'_> {
    fn drop(&mut self) {
        if !self.finished && (!self.updates.is_empty() || !self.inserted.is_empty()) {
            tracing::debug!(
                domain = %self.domain,
                "domain scope dropped without commit; staged writes discarded"
            );
        }
    }
}

/// Runs `f` inside a fresh scope over `domain`.
///
/// The scope is committed when `f` returns `Ok` and rolled back when it
/// returns `Err`, so no partial work of `f` is ever published.
///
/// # Errors
/// Returns the error of `f`, or the storage error raised when opening or
/// committing the scope.
pub fn within_scope<T, E, F>(store: &dyn CanonStore, domain: Domain, f: F) -> Result<T, E>
where
    E: From<StorageError>,
    F: FnOnce(&mut dyn DomainScope) -> Result<T, E>,
{
    let mut scope = store.begin(domain)?;
    match f(scope.as_mut()) {
        Ok(value) => {
            scope.commit()?;
            Ok(value)
        }
        Err(err) => {
            scope.rollback();
            Err(err)
        }
    }
}
