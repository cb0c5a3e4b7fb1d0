//! Abstract storage traits for pharmacanon.
//!
//! The canonicalization core never talks to a database directly. It works
//! against a [`DomainScope`]: a transactional view of one domain that stages
//! writes and publishes them all at once on [`DomainScope::commit`]. Backends
//! hand out scopes through [`CanonStore::begin`].

use thiserror::Error;

use crate::domain::Domain;
use crate::entity::{CanonicalEntity, CanonicalEntityId};
use crate::record::{AttributeRecord, NewRecord, RecordId};

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Record not found in the scope's domain.
    #[error("Record not found: {0}")]
    RecordNotFound(RecordId),

    /// Entity not found.
    #[error("Canonical entity {id} not found in domain {domain}")]
    EntityNotFound {
        domain: Domain,
        id: CanonicalEntityId,
    },

    /// `(domain, canonical_name)` already taken.
    #[error("Duplicate canonical entity in domain {domain}: '{name}'")]
    DuplicateEntity {
        domain: Domain,
        name: String,
    },

    /// Backend error.
    #[error("Storage backend error: {0}")]
    Backend(String),

    /// Serialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Backend configuration rejected.
    #[error("Invalid storage configuration: {0}")]
    Config(String),
}

/// A transactional view of one domain.
///
/// Reads see the committed state as of [`CanonStore::begin`] plus this
/// scope's own staged writes. Nothing is visible to other readers until
/// [`DomainScope::commit`] succeeds. Dropping a scope without committing
/// discards its staged writes.
pub trait DomainScope {
    /// The domain this scope covers.
    fn domain(&self) -> Domain;

    /// All records of the domain, ordered by id.
    fn records(&self) -> Result<Vec<AttributeRecord>, StorageError>;

    /// Stages a new canonical value for a record.
    fn set_canonical_value(&mut self, id: RecordId, value: String) -> Result<(), StorageError>;

    /// All canonical entities of the domain, ordered by id.
    fn entities(&self) -> Result<Vec<CanonicalEntity>, StorageError>;

    /// Stages a new canonical entity, allocating the next unused id.
    fn insert_entity(&mut self, canonical_name: &str) -> Result<CanonicalEntity, StorageError>;

    /// Publishes every staged write atomically.
    ///
    /// On error nothing is published.
    fn commit(self: Box<Self>) -> Result<(), StorageError>;

    /// Discards every staged write.
    fn rollback(self: Box<Self>);
}

/// Storage backend holding attribute records and canonical entities.
pub trait CanonStore: Send + Sync {
    /// Adds a record. The backend assigns its id.
    fn insert_record(&self, record: NewRecord) -> Result<AttributeRecord, StorageError>;

    /// Committed records of a domain, ordered by id.
    fn records(&self, domain: Domain) -> Result<Vec<AttributeRecord>, StorageError>;

    /// Committed canonical entities of a domain, ordered by id.
    fn entities(&self, domain: Domain) -> Result<Vec<CanonicalEntity>, StorageError>;

    /// Opens a transactional scope over one domain.
    ///
    /// Callers must not hold two scopes over the same domain at once.
    fn begin(&self, domain: Domain) -> Result<Box<dyn DomainScope + '_>, StorageError>;

    /// Removes an entity from the lookup table. Its id is never handed out
    /// again.
    fn retire_entity(
        &self,
        domain: Domain,
        id: CanonicalEntityId,
    ) -> Result<CanonicalEntity, StorageError>;
}
