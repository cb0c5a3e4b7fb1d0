//! Attribute records as seen by the canonicalization engine.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::Domain;

/// Storage-assigned identifier of an attribute record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(u64);

impl RecordId {
    /// Wraps a raw storage id.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw storage id.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A stored free-text attribute value and its canonical rewrite.
///
/// The storage layer owns records; the engine only ever changes
/// `canonical_value`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeRecord {
    /// Store-assigned id.
    pub id: RecordId,
    /// Attribute domain.
    pub domain: Domain,
    /// Value as imported. Never modified.
    pub raw_value: Option<String>,
    /// Canonical form, written only by the engine.
    #[serde(default)]
    pub canonical_value: Option<String>,
}

impl AttributeRecord {
    /// Creates a record that has not been canonicalized yet.
    #[must_use]
    pub fn new(id: RecordId, domain: Domain, raw_value: Option<String>) -> Self {
        Self {
            id,
            domain,
            raw_value,
            canonical_value: None,
        }
    }
}

/// An attribute value to be imported into a store, before it has an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRecord {
    /// Attribute domain.
    pub domain: Domain,
    /// Value as found in the source data.
    pub raw_value: Option<String>,
}
