//! Per-domain synonym maps.
//!
//! A [`SynonymMap`] is an exact-match dictionary from normalized variant to
//! canonical phrase, one table per [`Domain`]. It is built once from curated
//! configuration and never changes afterwards. There is no substring, prefix
//! or fuzzy matching: clinically distinct terms that share a prefix must not
//! be merged.
//!
//! Configuration is a JSON document:
//!
//! ```json
//! {
//!   "version": "2024-06",
//!   "entries": [
//!     { "domain": "target", "variant": "LTCC", "canonical": "l-type calcium channel" }
//!   ]
//! }
//! ```
//!
//! Variants are normalized on load. Canonicals must already be normalized.

mod curated;

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::Domain;
use crate::error::ValidationError;
use crate::normalize::normalize;

/// Version label used when a configuration does not carry one.
pub const UNVERSIONED: &str = "unversioned";

/// One curated `(domain, variant, canonical)` triple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynonymEntry {
    /// Vocabulary the entry belongs to.
    pub domain: Domain,
    /// Spelling found in the data. Normalized at load.
    pub variant: String,
    /// Canonical form. Must already be normalized.
    pub canonical: String,
}

impl SynonymEntry {
    /// Creates an entry.
    #[must_use]
    pub fn new(domain: Domain, variant: impl Into<String>, canonical: impl Into<String>) -> Self {
        Self {
            domain,
            variant: variant.into(),
            canonical: canonical.into(),
        }
    }
}

/// Serialized form of a synonym table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SynonymConfig {
    /// Version label; missing means unversioned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Synonym entries in any order.
    pub entries: Vec<SynonymEntry>,
}

/// Validated, immutable synonym dictionary.
#[derive(Debug, Clone)]
pub struct SynonymMap {
    version: String,
    fingerprint: String,
    tables: HashMap<Domain, HashMap<String, String>>,
}

impl SynonymMap {
    /// A map with no entries. Every value passes through.
    #[must_use]
    pub fn empty() -> Self {
        Self::build(UNVERSIONED.to_string(), HashMap::new())
    }

    /// The built-in curated tables for targets, effects and roles.
    ///
    /// # Errors
    /// Returns a [`ValidationError`] if the curated data is inconsistent.
    pub fn curated() -> Result<Self, ValidationError> {
        let entries = curated::ENTRIES
            .iter()
            .map(|&(domain, variant, canonical)| SynonymEntry::new(domain, variant, canonical));
        Self::from_entries(curated::VERSION, entries)
    }

    /// Validates entries and builds the map.
    ///
    /// # Errors
    /// - [`ValidationError::EmptyVariant`] if a variant normalizes to nothing
    /// - [`ValidationError::EmptyCanonical`] if a canonical is blank
    /// - [`ValidationError::CanonicalNotNormalized`] if a canonical is not in normalized form
    /// - [`ValidationError::ConflictingSynonym`] if a `(domain, variant)` key maps to two canonicals
    pub fn from_entries(
        version: impl Into<String>,
        entries: impl IntoIterator<Item = SynonymEntry>,
    ) -> Result<Self, ValidationError> {
        let mut tables: HashMap<Domain, HashMap<String, String>> = HashMap::new();

        for entry in entries {
            let variant = normalize(&entry.variant);
            if variant.is_empty() {
                return Err(ValidationError::EmptyVariant {
                    domain: entry.domain,
                });
            }
            if entry.canonical.trim().is_empty() {
                return Err(ValidationError::EmptyCanonical {
                    domain: entry.domain,
                    variant,
                });
            }
            let expected = normalize(&entry.canonical);
            if expected != entry.canonical {
                return Err(ValidationError::CanonicalNotNormalized {
                    domain: entry.domain,
                    variant,
                    canonical: entry.canonical,
                    expected,
                });
            }

            let table = tables.entry(entry.domain).or_default();
            match table.get(&variant) {
                Some(existing) if *existing == entry.canonical => {
                    tracing::debug!(domain = %entry.domain, %variant, "duplicate synonym entry ignored");
                }
                Some(existing) => {
                    return Err(ValidationError::ConflictingSynonym {
                        domain: entry.domain,
                        variant,
                        existing: existing.clone(),
                        conflicting: entry.canonical,
                    });
                }
                None => {
                    table.insert(variant, entry.canonical);
                }
            }
        }

        let map = Self::build(version.into(), tables);
        tracing::info!(
            version = %map.version,
            fingerprint = %map.fingerprint,
            entries = map.len(),
            "synonym map loaded"
        );
        Ok(map)
    }

    /// Builds the map from a deserialized configuration.
    ///
    /// # Errors
    /// See [`SynonymMap::from_entries`].
    pub fn from_config(config: SynonymConfig) -> Result<Self, ValidationError> {
        let version = config.version.unwrap_or_else(|| UNVERSIONED.to_string());
        Self::from_entries(version, config.entries)
    }

    /// Parses a JSON configuration document.
    ///
    /// # Errors
    /// [`ValidationError::MalformedConfig`] on JSON errors, otherwise see
    /// [`SynonymMap::from_entries`].
    pub fn from_json_str(json: &str) -> Result<Self, ValidationError> {
        let config: SynonymConfig =
            serde_json::from_str(json).map_err(|e| ValidationError::MalformedConfig {
                reason: e.to_string(),
            })?;
        Self::from_config(config)
    }

    /// Reads and parses a JSON configuration file.
    ///
    /// # Errors
    /// [`ValidationError::MalformedConfig`] if the file cannot be read or
    /// parsed, otherwise see [`SynonymMap::from_entries`].
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ValidationError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|e| ValidationError::MalformedConfig {
            reason: format!("failed to read {}: {e}", path.display()),
        })?;
        Self::from_json_str(&json)
    }

    /// Exact-match lookup of an already normalized variant.
    #[must_use]
    pub fn lookup(&self, domain: Domain, normalized_variant: &str) -> Option<&str> {
        self.tables
            .get(&domain)
            .and_then(|table| table.get(normalized_variant))
            .map(String::as_str)
    }

    /// Version label of the loaded configuration.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Hex-encoded blake3 digest over the sorted entries.
    ///
    /// Two maps with the same entries have the same fingerprint regardless of
    /// the order or duplication of the source configuration.
    #[must_use]
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Total number of distinct keys across all domains.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.values().map(HashMap::len).sum()
    }

    /// Returns true if no domain has any entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of keys in one domain.
    #[must_use]
    pub fn len_for(&self, domain: Domain) -> usize {
        self.tables.get(&domain).map_or(0, HashMap::len)
    }

    /// The controlled vocabulary reachable through synonyms in a domain.
    #[must_use]
    pub fn canonicals(&self, domain: Domain) -> Vec<&str> {
        let mut out: Vec<&str> = self
            .tables
            .get(&domain)
            .map(|t| t.values().map(String::as_str).collect())
            .unwrap_or_default();
        out.sort_unstable();
        out.dedup();
        out
    }

    /// Exports the map back into configuration form, sorted by domain and variant.
    #[must_use]
    pub fn to_config(&self) -> SynonymConfig {
        let entries = self
            .sorted()
            .into_iter()
            .map(|(domain, variant, canonical)| SynonymEntry::new(domain, variant, canonical))
            .collect();
        SynonymConfig {
            version: Some(self.version.clone()),
            entries,
        }
    }

    fn build(version: String, tables: HashMap<Domain, HashMap<String, String>>) -> Self {
        let mut map = Self {
            version,
            fingerprint: String::new(),
            tables,
        };
        map.fingerprint = map.compute_fingerprint();
        map
    }

    fn sorted(&self) -> Vec<(Domain, &str, &str)> {
        let mut sorted: BTreeMap<(Domain, &str), &str> = BTreeMap::new();
        for (domain, table) in &self.tables {
            for (variant, canonical) in table {
                sorted.insert((*domain, variant.as_str()), canonical.as_str());
            }
        }
        sorted
            .into_iter()
            .map(|((domain, variant), canonical)| (domain, variant, canonical))
            .collect()
    }

    fn compute_fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for (domain, variant, canonical) in self.sorted() {
            hasher.update(domain.as_str().as_bytes());
            hasher.update(b"\0");
            hasher.update(variant.as_bytes());
            hasher.update(b"\0");
            hasher.update(canonical.as_bytes());
            hasher.update(b"\n");
        }
        hasher.finalize().to_hex().to_string()
    }
}

impl Default for SynonymMap {
    fn default() -> Self {
        Self::empty()
    }
}
