//! Backend-neutral store state.
//!
//! Both the in-memory and the persistent backends keep their data in a
//! [`StoreState`] and mutate it only through [`StoreState::apply`], which
//! checks a whole change set before touching anything.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::Domain;
use crate::entity::{CanonicalEntity, CanonicalEntityId};
use crate::record::{AttributeRecord, NewRecord, RecordId};
use crate::storage::scope::{DomainChangeSet, DomainSnapshot};
use crate::storage::traits::StorageError;

#[derive(Debug, Clone)]
struct DomainState {
    records: BTreeMap<RecordId, AttributeRecord>,
    entities: BTreeMap<CanonicalEntityId, CanonicalEntity>,
    next_entity_id: CanonicalEntityId,
}

impl Default for DomainState {
    fn default() -> Self {
        Self {
            records: BTreeMap::new(),
            entities: BTreeMap::new(),
            next_entity_id: CanonicalEntityId::FIRST,
        }
    }
}

#[derive(Debug)]
pub(crate) struct StoreState {
    domains: BTreeMap<Domain, DomainState>,
    next_record_id: u64,
}

impl Default for StoreState {
    fn default() -> Self {
        Self {
            domains: BTreeMap::new(),
            next_record_id: 1,
        }
    }
}

impl StoreState {
    /// Allocates an id without inserting anything.
    pub(crate) fn allocate_record(&self, record: NewRecord) -> AttributeRecord {
        AttributeRecord::new(RecordId::new(self.next_record_id), record.domain, record.raw_value)
    }

    /// Inserts a record carrying an id from [`StoreState::allocate_record`]
    /// (or from a replayed log).
    pub(crate) fn insert_record(&mut self, record: AttributeRecord) -> Result<(), StorageError> {
        if self
            .domains
            .values()
            .any(|d| d.records.contains_key(&record.id))
        {
            return Err(StorageError::Backend(format!(
                "record id {} already exists",
                record.id
            )));
        }
        self.next_record_id = self.next_record_id.max(record.id.get() + 1);
        self.domains
            .entry(record.domain)
            .or_default()
            .records
            .insert(record.id, record);
        Ok(())
    }

    pub(crate) fn records(&self, domain: Domain) -> Vec<AttributeRecord> {
        self.domains
            .get(&domain)
            .map(|d| d.records.values().cloned().collect())
            .unwrap_or_default()
    }

    pub(crate) fn entities(&self, domain: Domain) -> Vec<CanonicalEntity> {
        self.domains
            .get(&domain)
            .map(|d| d.entities.values().cloned().collect())
            .unwrap_or_default()
    }

    pub(crate) fn snapshot(&self, domain: Domain) -> DomainSnapshot {
        match self.domains.get(&domain) {
            Some(d) => DomainSnapshot {
                records: d.records.clone(),
                entities: d.entities.values().cloned().collect(),
                next_entity_id: d.next_entity_id,
            },
            None => DomainSnapshot {
                records: BTreeMap::new(),
                entities: Vec::new(),
                next_entity_id: CanonicalEntityId::FIRST,
            },
        }
    }

    /// Checks that a change set can be applied in full.
    pub(crate) fn check(&self, changes: &DomainChangeSet) -> Result<(), StorageError> {
        let empty = DomainState::default();
        let state = self.domains.get(&changes.domain).unwrap_or(&empty);

        for update in &changes.canonical_updates {
            if !state.records.contains_key(&update.id) {
                return Err(StorageError::RecordNotFound(update.id));
            }
        }

        let mut next = state.next_entity_id;
        for entity in &changes.new_entities {
            if entity.domain != changes.domain {
                return Err(StorageError::Backend(format!(
                    "entity '{}' belongs to {}, change set is for {}",
                    entity.canonical_name, entity.domain, changes.domain
                )));
            }
            if entity.id < next {
                return Err(StorageError::Backend(format!(
                    "entity id {} in domain {} was already allocated (stale scope)",
                    entity.id, changes.domain
                )));
            }
            if state
                .entities
                .values()
                .any(|e| e.canonical_name == entity.canonical_name)
            {
                return Err(StorageError::DuplicateEntity {
                    domain: changes.domain,
                    name: entity.canonical_name.clone(),
                });
            }
            next = entity.id.next();
        }
        Ok(())
    }

    /// Checks and applies a change set. Nothing is applied on error.
    pub(crate) fn apply(&mut self, changes: &DomainChangeSet) -> Result<(), StorageError> {
        self.check(changes)?;
        let state = self.domains.entry(changes.domain).or_default();
        for update in &changes.canonical_updates {
            if let Some(record) = state.records.get_mut(&update.id) {
                record.canonical_value = Some(update.canonical_value.clone());
            }
        }
        for entity in &changes.new_entities {
            state.next_entity_id = state.next_entity_id.max(entity.id.next());
            state.entities.insert(entity.id, entity.clone());
        }
        Ok(())
    }

    /// Removes an entity, keeping the id high-water mark.
    pub(crate) fn retire(
        &mut self,
        domain: Domain,
        id: CanonicalEntityId,
    ) -> Result<CanonicalEntity, StorageError> {
        self.domains
            .get_mut(&domain)
            .and_then(|d| d.entities.remove(&id))
            .ok_or(StorageError::EntityNotFound { domain, id })
    }

    pub(crate) fn to_image(&self) -> StateImage {
        StateImage {
            next_record_id: self.next_record_id,
            domains: self
                .domains
                .iter()
                .map(|(domain, d)| DomainImage {
                    domain: *domain,
                    next_entity_id: d.next_entity_id,
                    records: d.records.values().cloned().collect(),
                    entities: d.entities.values().cloned().collect(),
                })
                .collect(),
        }
    }

    pub(crate) fn from_image(image: StateImage) -> Self {
        let domains = image
            .domains
            .into_iter()
            .map(|d| {
                let state = DomainState {
                    records: d.records.into_iter().map(|r| (r.id, r)).collect(),
                    entities: d.entities.into_iter().map(|e| (e.id, e)).collect(),
                    next_entity_id: d.next_entity_id,
                };
                (d.domain, state)
            })
            .collect();
        Self {
            domains,
            next_record_id: image.next_record_id,
        }
    }
}

/// Serializable image of a [`StoreState`], used for snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct StateImage {
    next_record_id: u64,
    domains: Vec<DomainImage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DomainImage {
    domain: Domain,
    next_entity_id: CanonicalEntityId,
    records: Vec<AttributeRecord>,
    entities: Vec<CanonicalEntity>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::scope::CanonicalUpdate;

    fn seeded() -> (StoreState, RecordId) {
        let mut state = StoreState::default();
        let record = state.allocate_record(NewRecord {
            domain: Domain::Target,
            raw_value: Some("LTCC".to_string()),
        });
        let id = record.id;
        state.insert_record(record).unwrap();
        (state, id)
    }

    #[test]
    fn test_apply_is_all_or_nothing() {
        let (mut state, id) = seeded();
        let changes = DomainChangeSet {
            domain: Domain::Target,
            canonical_updates: vec![
                CanonicalUpdate {
                    id,
                    canonical_value: "l-type calcium channel".to_string(),
                },
                CanonicalUpdate {
                    id: RecordId::new(999),
                    canonical_value: "x".to_string(),
                },
            ],
            new_entities: Vec::new(),
        };
        let err = state.apply(&changes).unwrap_err();
        assert!(matches!(err, StorageError::RecordNotFound(_)));
        assert_eq!(state.records(Domain::Target)[0].canonical_value, None);
    }

    #[test]
    fn test_stale_entity_id_rejected() {
        let (mut state, _) = seeded();
        let first = DomainChangeSet {
            domain: Domain::Target,
            canonical_updates: Vec::new(),
            new_entities: vec![CanonicalEntity::new(CanonicalEntityId::FIRST, Domain::Target, "sert")],
        };
        state.apply(&first).unwrap();

        let stale = DomainChangeSet {
            domain: Domain::Target,
            canonical_updates: Vec::new(),
            new_entities: vec![CanonicalEntity::new(CanonicalEntityId::FIRST, Domain::Target, "cox1")],
        };
        assert!(matches!(state.apply(&stale), Err(StorageError::Backend(_))));
    }

    #[test]
    fn test_retire_keeps_high_water_mark() {
        let (mut state, _) = seeded();
        let changes = DomainChangeSet {
            domain: Domain::Target,
            canonical_updates: Vec::new(),
            new_entities: vec![CanonicalEntity::new(CanonicalEntityId::FIRST, Domain::Target, "sert")],
        };
        state.apply(&changes).unwrap();
        state.retire(Domain::Target, CanonicalEntityId::FIRST).unwrap();
        assert!(state.entities(Domain::Target).is_empty());
        assert_eq!(state.snapshot(Domain::Target).next_entity_id.get(), 2);
        assert!(matches!(
            state.retire(Domain::Target, CanonicalEntityId::FIRST),
            Err(StorageError::EntityNotFound { .. })
        ));
    }

    #[test]
    fn test_image_roundtrip_preserves_counters() {
        let (mut state, _) = seeded();
        state
            .apply(&DomainChangeSet {
                domain: Domain::Target,
                canonical_updates: Vec::new(),
                new_entities: vec![CanonicalEntity::new(CanonicalEntityId::new(3), Domain::Target, "sert")],
            })
            .unwrap();
        let json = serde_json::to_string(&state.to_image()).unwrap();
        let restored = StoreState::from_image(serde_json::from_str(&json).unwrap());
        assert_eq!(restored.snapshot(Domain::Target).next_entity_id.get(), 4);
        assert_eq!(restored.records(Domain::Target).len(), 1);
        let next = restored.allocate_record(NewRecord {
            domain: Domain::Role,
            raw_value: None,
        });
        assert_eq!(next.id.get(), 2);
    }
}
