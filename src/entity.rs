//! Canonical entities and their surrogate identifiers.
//!
//! A canonical entity is the lookup-table row for one canonical value in one
//! domain. Its id is assigned once, on first appearance, and never changes or
//! gets reused, so foreign keys pointing at it stay valid across reruns.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::Domain;

/// Stable surrogate identifier of a canonical entity, unique within a domain.
///
/// Ids start at 1 and are handed out by the storage backend from a
/// per-domain high-water mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalEntityId(u64);

impl CanonicalEntityId {
    /// The first id handed out in an empty domain.
    pub const FIRST: Self = Self(1);

    /// Wraps a raw id.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw id.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// The id immediately after this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for CanonicalEntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One row of the canonical-entity lookup table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalEntity {
    /// Surrogate id.
    pub id: CanonicalEntityId,

    /// Owning domain.
    pub domain: Domain,

    /// The canonical value this entity stands for. Unique within `domain`.
    pub canonical_name: String,

    /// When the entity was first inserted.
    pub created_at: DateTime<Utc>,
}

impl CanonicalEntity {
    /// Creates an entity row stamped with the current time.
    #[must_use]
    pub fn new(id: CanonicalEntityId, domain: Domain, canonical_name: impl Into<String>) -> Self {
        Self {
            id,
            domain,
            canonical_name: canonical_name.into(),
            created_at: Utc::now(),
        }
    }
}
