//! Canonical entity table derivation.
//!
//! After the engine has committed a domain, the builder folds the distinct
//! canonical values into the entity table. It is insert-if-absent: existing
//! entities keep their ids, new values get fresh ids, nothing is deleted or
//! renumbered.

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;

use crate::domain::Domain;
use crate::entity::CanonicalEntity;
use crate::error::{CanonResult, ConflictError};
use crate::normalize::normalize;
use crate::storage::DomainScope;

/// Outcome of one builder run over one domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    /// Domain the run covered.
    pub domain: Domain,
    /// Distinct non-null, non-empty canonical values found in the records.
    pub distinct_values: usize,
    /// Records whose canonical value is `""`. No entity is ever created for
    /// the empty value.
    pub skipped_empty: usize,
    /// Values that already had an entity.
    pub existing: usize,
    /// Entities created by this run, in id order.
    pub inserted: Vec<CanonicalEntity>,
}

/// Derives the per-domain canonical entity table.
#[derive(Debug, Clone, Copy, Default)]
pub struct CanonicalTableBuilder;

impl CanonicalTableBuilder {
    /// Creates a builder.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Inserts an entity for every canonical value of the scope's domain that
    /// does not have one yet.
    ///
    /// New values are inserted in sorted order, so the same data always gets
    /// the same ids. All conflicts are detected before the first insert.
    ///
    /// # Errors
    /// - [`ConflictError::DuplicateEntityKey`] if two different stored values
    ///   (or a value and an existing entity name) share a normalized key
    /// - any storage error raised by the scope
    pub fn build(&self, scope: &mut dyn DomainScope) -> CanonResult<BuildReport> {
        let domain = scope.domain();

        let mut skipped_empty = 0usize;
        let mut values = BTreeSet::new();
        for value in scope.records()?.into_iter().filter_map(|r| r.canonical_value) {
            if value.is_empty() {
                skipped_empty += 1;
            } else {
                values.insert(value);
            }
        }

        let mut by_key: HashMap<String, String> = HashMap::new();
        for entity in scope.entities()? {
            claim(&mut by_key, domain, &entity.canonical_name)?;
        }

        let mut existing = 0usize;
        let mut fresh = Vec::new();
        for value in &values {
            if claim(&mut by_key, domain, value)? {
                fresh.push(value);
            } else {
                existing += 1;
            }
        }

        let mut inserted = Vec::with_capacity(fresh.len());
        for value in fresh {
            let entity = scope.insert_entity(value)?;
            tracing::debug!(%domain, id = %entity.id, name = %entity.canonical_name, "new canonical entity");
            inserted.push(entity);
        }

        tracing::info!(
            %domain,
            distinct_values = values.len(),
            skipped_empty,
            existing,
            inserted = inserted.len(),
            "built canonical entity table"
        );
        Ok(BuildReport {
            domain,
            distinct_values: values.len(),
            skipped_empty,
            existing,
            inserted,
        })
    }
}

/// Registers `name` under its normalized key.
///
/// Returns true if the key was free, false if `name` itself already holds
/// it, and a conflict if a different name holds it.
fn claim(by_key: &mut HashMap<String, String>, domain: Domain, name: &str) -> Result<bool, ConflictError> {
    let key = normalize(name);
    match by_key.get(&key) {
        Some(holder) if holder == name => Ok(false),
        Some(holder) => Err(ConflictError::DuplicateEntityKey {
            domain,
            key,
            first: holder.clone(),
            second: name.to_string(),
        }),
        None => {
            by_key.insert(key, name.to_string());
            Ok(true)
        }
    }
}
