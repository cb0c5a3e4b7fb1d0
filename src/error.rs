//! Error types for pharmacanon.
//!
//! All errors are strongly typed using thiserror so callers can match on the
//! exact failure and surface the offending domain and value to curators.

use thiserror::Error;

use crate::domain::Domain;
use crate::record::RecordId;
use crate::storage::StorageError;

/// Synonym configuration errors. Always raised before any write happens.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Conflicting synonym for ({domain}, '{variant}'): '{existing}' vs '{conflicting}'")]
    ConflictingSynonym {
        domain: Domain,
        variant: String,
        existing: String,
        conflicting: String,
    },

    #[error("Synonym variant in domain {domain} is empty after normalization")]
    EmptyVariant {
        domain: Domain,
    },

    #[error("Canonical value for ({domain}, '{variant}') is empty")]
    EmptyCanonical {
        domain: Domain,
        variant: String,
    },

    #[error("Canonical value '{canonical}' for ({domain}, '{variant}') is not normalized (expected '{expected}')")]
    CanonicalNotNormalized {
        domain: Domain,
        variant: String,
        canonical: String,
        expected: String,
    },

    #[error("Unknown domain '{value}' (expected one of: target, effect, role)")]
    UnknownDomain {
        value: String,
    },

    #[error("Malformed synonym configuration: {reason}")]
    MalformedConfig {
        reason: String,
    },
}

/// Entity-table conflicts detected while building canonical entities.
#[derive(Debug, Error)]
pub enum ConflictError {
    #[error("Canonical values '{first}' and '{second}' in domain {domain} collapse to the same entity key '{key}'")]
    DuplicateEntityKey {
        domain: Domain,
        key: String,
        first: String,
        second: String,
    },
}

/// Errors raised while executing a canonicalization run.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Record {id} belongs to domain {actual}, but the scope is for {expected}")]
    DomainMismatch {
        id: RecordId,
        expected: Domain,
        actual: Domain,
    },
}

/// Top-level error type for pharmacanon.
#[derive(Debug, Error)]
pub enum CanonError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Conflict error: {0}")]
    Conflict(#[from] ConflictError),

    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl CanonError {
    /// Returns true if this is a synonym validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is an entity-table conflict.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    /// Returns true if this is an execution error.
    #[must_use]
    pub const fn is_execution(&self) -> bool {
        matches!(self, Self::Execution(_))
    }

    /// Returns true if this error came from the storage collaborator.
    #[must_use]
    pub const fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_))
    }

    /// The domain the failure is attributed to, when known.
    #[must_use]
    pub fn domain(&self) -> Option<Domain> {
        match self {
            Self::Validation(
                ValidationError::ConflictingSynonym { domain, .. }
                | ValidationError::EmptyVariant { domain }
                | ValidationError::EmptyCanonical { domain, .. }
                | ValidationError::CanonicalNotNormalized { domain, .. },
            )
            | Self::Conflict(ConflictError::DuplicateEntityKey { domain, .. }) => Some(*domain),
            Self::Execution(ExecutionError::DomainMismatch { expected, .. }) => Some(*expected),
            Self::Validation(_) | Self::Storage(_) => None,
        }
    }
}

/// Result type alias for pharmacanon operations.
pub type CanonResult<T> = Result<T, CanonError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflicting_synonym_message_names_both_canonicals() {
        let err = ValidationError::ConflictingSynonym {
            domain: Domain::Role,
            variant: "inhibitor".to_string(),
            existing: "ингибитор".to_string(),
            conflicting: "инхибитор".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("role"));
        assert!(msg.contains("inhibitor"));
        assert!(msg.contains("ингибитор"));
        assert!(msg.contains("инхибитор"));
    }

    #[test]
    fn test_conflict_error_message() {
        let err = ConflictError::DuplicateEntityKey {
            domain: Domain::Target,
            key: "cox1".to_string(),
            first: "COX1".to_string(),
            second: "cox1".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("target"));
        assert!(msg.contains("COX1"));
    }

    #[test]
    fn test_canon_error_from_validation() {
        let err: CanonError = ValidationError::EmptyVariant { domain: Domain::Effect }.into();
        assert!(err.is_validation());
        assert!(!err.is_conflict());
        assert_eq!(err.domain(), Some(Domain::Effect));
    }

    #[test]
    fn test_canon_error_from_storage() {
        let err: CanonError = StorageError::Backend("disk full".to_string()).into();
        assert!(err.is_storage());
        assert_eq!(err.domain(), None);
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn test_canon_error_from_conflict() {
        let err: CanonError = ConflictError::DuplicateEntityKey {
            domain: Domain::Role,
            key: "агонист".to_string(),
            first: "Агонист".to_string(),
            second: "агонист".to_string(),
        }
        .into();
        assert!(err.is_conflict());
        assert_eq!(err.domain(), Some(Domain::Role));
    }
}
