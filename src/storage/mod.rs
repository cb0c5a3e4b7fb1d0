//! Storage collaborators for pharmacanon.
//!
//! The traits in this module define what the canonicalization core needs
//! from a backend. Two backends ship with the crate: an in-memory store and,
//! behind the `persistent` feature, a WAL-backed on-disk store.

mod memory;
mod scope;
mod state;
mod traits;

#[cfg(feature = "persistent")]
pub mod persistent;

pub use memory::InMemoryStore;
pub use scope::{within_scope, CanonicalUpdate, DomainChangeSet};
pub use traits::{CanonStore, DomainScope, StorageError};

#[cfg(feature = "persistent")]
pub use persistent::{open_store, PersistentConfig, PersistentStore};
