//! # pharmacanon - controlled vocabularies for pharmacological attributes
//!
//! pharmacanon rewrites noisy, multilingual free-text attribute values (drug
//! targets, adverse effects, metabolism roles) into one canonical form per
//! concept and domain, and keeps a lookup table of canonical entities with
//! stable surrogate ids.
//!
//! ## Core Concepts
//!
//! - **Domain**: an attribute category with its own vocabulary (`target`, `effect`, `role`)
//! - **normalize**: trim, lowercase, collapse whitespace
//! - **SynonymMap**: curated exact-match dictionary from variant to canonical value
//! - **CanonicalizationEngine**: rewrites stored canonical values, idempotently
//! - **CanonicalTableBuilder**: insert-if-absent entity table with never-reused ids
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use pharmacanon::{Canonicalizer, CanonStore, Domain, InMemoryStore, NewRecord, SynonymMap};
//!
//! let store = InMemoryStore::new();
//! store.insert_record(NewRecord { domain: Domain::Target, raw_value: Some("LTCC".into()) })?;
//!
//! let canonicalizer = Canonicalizer::new(Arc::new(SynonymMap::curated()?));
//! let report = canonicalizer.run_domain(&store, Domain::Target)?;
//! assert_eq!(report.table.inserted[0].canonical_name, "l-type calcium channel");
//! # Ok::<(), pharmacanon::CanonError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod builder;
pub mod domain;
pub mod engine;
pub mod entity;
pub mod error;
pub mod normalize;
pub mod pipeline;
pub mod record;
pub mod storage;
pub mod synonym;

// Re-export primary types at crate root for convenience
pub use builder::{BuildReport, CanonicalTableBuilder};
pub use domain::Domain;
pub use engine::{CanonicalizationEngine, CanonicalizationReport, Resolution, ResolutionSource};
pub use entity::{CanonicalEntity, CanonicalEntityId};
pub use error::{CanonError, CanonResult, ConflictError, ExecutionError, ValidationError};
pub use normalize::{is_normalized, normalize};
pub use pipeline::{Canonicalizer, DomainRunReport};
pub use record::{AttributeRecord, NewRecord, RecordId};
pub use storage::{within_scope, CanonStore, DomainScope, InMemoryStore, StorageError};
pub use synonym::{SynonymConfig, SynonymEntry, SynonymMap};

#[cfg(feature = "persistent")]
pub use storage::{open_store, PersistentConfig, PersistentStore};
