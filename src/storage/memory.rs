//! In-memory storage backend.
//!
//! Thread-safe reference implementation of [`CanonStore`], intended for
//! embedded usage and tests.

use std::sync::RwLock;

use crate::domain::Domain;
use crate::entity::{CanonicalEntity, CanonicalEntityId};
use crate::record::{AttributeRecord, NewRecord};
use crate::storage::scope::{ChangeSink, DomainChangeSet, StagedScope};
use crate::storage::state::StoreState;
use crate::storage::traits::{CanonStore, DomainScope, StorageError};

fn lock_err(context: &'static str) -> StorageError {
    StorageError::Backend(format!("poisoned lock: {context}"))
}

/// Thread-safe in-memory store.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<StoreState>,
}

impl InMemoryStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ChangeSink for InMemoryStore {
    fn publish(&self, changes: DomainChangeSet) -> Result<(), StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("memory.publish"))?;
        state.apply(&changes)
    }
}

impl CanonStore for InMemoryStore {
    fn insert_record(&self, record: NewRecord) -> Result<AttributeRecord, StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("memory.insert_record"))?;
        let record = state.allocate_record(record);
        state.insert_record(record.clone())?;
        Ok(record)
    }

    fn records(&self, domain: Domain) -> Result<Vec<AttributeRecord>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("memory.records"))?;
        Ok(state.records(domain))
    }

    fn entities(&self, domain: Domain) -> Result<Vec<CanonicalEntity>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("memory.entities"))?;
        Ok(state.entities(domain))
    }

    fn begin(&self, domain: Domain) -> Result<Box<dyn DomainScope + '_>, StorageError> {
        let snapshot = self
            .state
            .read()
            .map_err(|_| lock_err("memory.begin"))?
            .snapshot(domain);
        Ok(Box::new(StagedScope::new(self, domain, snapshot)))
    }

    fn retire_entity(
        &self,
        domain: Domain,
        id: CanonicalEntityId,
    ) -> Result<CanonicalEntity, StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("memory.retire"))?;
        state.retire(domain, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordId;
    use crate::storage::within_scope;

    fn store_with(domain: Domain, raws: &[&str]) -> InMemoryStore {
        let store = InMemoryStore::new();
        for raw in raws {
            store
                .insert_record(NewRecord {
                    domain,
                    raw_value: Some((*raw).to_string()),
                })
                .unwrap();
        }
        store
    }

    #[test]
    fn test_record_ids_are_global_and_ordered() {
        let store = InMemoryStore::new();
        let a = store
            .insert_record(NewRecord { domain: Domain::Target, raw_value: None })
            .unwrap();
        let b = store
            .insert_record(NewRecord { domain: Domain::Role, raw_value: Some("x".into()) })
            .unwrap();
        assert_eq!(a.id, RecordId::new(1));
        assert_eq!(b.id, RecordId::new(2));
        assert_eq!(store.records(Domain::Target).unwrap().len(), 1);
        assert_eq!(store.records(Domain::Role).unwrap().len(), 1);
        assert!(store.records(Domain::Effect).unwrap().is_empty());
    }

    #[test]
    fn test_commit_publishes_staged_writes() {
        let store = store_with(Domain::Target, &["LTCC"]);
        let id = store.records(Domain::Target).unwrap()[0].id;

        let mut scope = store.begin(Domain::Target).unwrap();
        scope.set_canonical_value(id, "l-type calcium channel".into()).unwrap();
        // not yet visible outside the scope
        assert_eq!(store.records(Domain::Target).unwrap()[0].canonical_value, None);
        // visible inside
        assert_eq!(
            scope.records().unwrap()[0].canonical_value.as_deref(),
            Some("l-type calcium channel")
        );
        scope.commit().unwrap();

        assert_eq!(
            store.records(Domain::Target).unwrap()[0].canonical_value.as_deref(),
            Some("l-type calcium channel")
        );
    }

    #[test]
    fn test_drop_without_commit_discards() {
        let store = store_with(Domain::Effect, &["ulcer"]);
        let id = store.records(Domain::Effect).unwrap()[0].id;
        {
            let mut scope = store.begin(Domain::Effect).unwrap();
            scope.set_canonical_value(id, "x".into()).unwrap();
            scope.insert_entity("x").unwrap();
        }
        assert_eq!(store.records(Domain::Effect).unwrap()[0].canonical_value, None);
        assert!(store.entities(Domain::Effect).unwrap().is_empty());
    }

    #[test]
    fn test_within_scope_rolls_back_on_error() {
        let store = store_with(Domain::Role, &["inhibitor", "inducer"]);
        let ids: Vec<_> = store.records(Domain::Role).unwrap().iter().map(|r| r.id).collect();

        let result: Result<(), StorageError> = within_scope(&store, Domain::Role, |scope| {
            scope.set_canonical_value(ids[0], "ингибитор".into())?;
            scope.set_canonical_value(RecordId::new(404), "x".into())?;
            Ok(())
        });
        assert!(matches!(result, Err(StorageError::RecordNotFound(_))));
        assert!(store
            .records(Domain::Role)
            .unwrap()
            .iter()
            .all(|r| r.canonical_value.is_none()));
    }

    #[test]
    fn test_entity_ids_are_sequential_per_domain() {
        let store = InMemoryStore::new();
        within_scope::<_, StorageError, _>(&store, Domain::Target, |scope| {
            scope.insert_entity("sert")?;
            scope.insert_entity("cox1")
        })
        .unwrap();
        let effect = within_scope::<_, StorageError, _>(&store, Domain::Effect, |scope| {
            scope.insert_entity("низкий натрий")
        })
        .unwrap();

        let targets = store.entities(Domain::Target).unwrap();
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].id.get(), 1);
        assert_eq!(targets[1].id.get(), 2);
        assert_eq!(effect.id.get(), 1);
    }

    #[test]
    fn test_duplicate_entity_rejected_in_scope() {
        let store = InMemoryStore::new();
        let mut scope = store.begin(Domain::Target).unwrap();
        scope.insert_entity("sert").unwrap();
        assert!(matches!(
            scope.insert_entity("sert"),
            Err(StorageError::DuplicateEntity { .. })
        ));
    }

    #[test]
    fn test_retired_ids_are_not_reused() {
        let store = InMemoryStore::new();
        let first = within_scope::<_, StorageError, _>(&store, Domain::Target, |scope| {
            scope.insert_entity("sert")
        })
        .unwrap();
        store.retire_entity(Domain::Target, first.id).unwrap();

        let second = within_scope::<_, StorageError, _>(&store, Domain::Target, |scope| {
            scope.insert_entity("sert")
        })
        .unwrap();
        assert!(second.id > first.id);
    }

    #[test]
    fn test_overlapping_scopes_on_same_domain_detected() {
        let store = InMemoryStore::new();
        let mut a = store.begin(Domain::Role).unwrap();
        let mut b = store.begin(Domain::Role).unwrap();
        a.insert_entity("ингибитор").unwrap();
        b.insert_entity("индуктор").unwrap();
        a.commit().unwrap();
        assert!(b.commit().is_err());
        assert_eq!(store.entities(Domain::Role).unwrap().len(), 1);
    }
}
