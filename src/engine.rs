//! The canonicalization engine.
//!
//! For each record of a domain the engine normalizes the raw value, looks it
//! up in the [`SynonymMap`] and falls back to the normalized value itself when
//! there is no entry. The stored canonical value is rewritten only when it
//! differs, so a second run over the same data writes nothing.
//!
//! The engine works inside a [`DomainScope`] supplied by the caller; it never
//! opens, commits or rolls back scopes on its own.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::domain::Domain;
use crate::error::{CanonResult, ExecutionError};
use crate::normalize::normalize;
use crate::storage::DomainScope;
use crate::synonym::SynonymMap;

/// Where a canonical value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionSource {
    /// A curated synonym entry matched.
    Synonym,
    /// No entry matched; the normalized value is kept.
    PassThrough,
}

/// Outcome of resolving one raw value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    /// The canonical value.
    pub canonical: String,
    /// Whether a synonym entry produced it.
    pub source: ResolutionSource,
}

/// Counters and curation worklist of one engine run over one domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CanonicalizationReport {
    /// Domain the run covered.
    pub domain: Domain,
    /// Records read.
    pub examined: usize,
    /// Records with no raw value.
    pub skipped_null: usize,
    /// Records whose raw value normalizes to the empty string. They resolve
    /// to `""` like any other pass-through value but are not reported as
    /// unmatched.
    pub blank: usize,
    /// Records whose canonical value was rewritten.
    pub updated: usize,
    /// Records that already carried the right canonical value.
    pub unchanged: usize,
    /// Records resolved through a synonym entry.
    pub synonym_hits: usize,
    /// Records resolved by pass-through.
    pub passthrough: usize,
    /// Distinct normalized values with no synonym entry.
    pub unmatched: BTreeSet<String>,
}

impl CanonicalizationReport {
    fn new(domain: Domain) -> Self {
        Self {
            domain,
            examined: 0,
            skipped_null: 0,
            blank: 0,
            updated: 0,
            unchanged: 0,
            synonym_hits: 0,
            passthrough: 0,
            unmatched: BTreeSet::new(),
        }
    }

    /// Returns true if the run wrote nothing.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.updated == 0
    }
}

/// Rewrites stored canonical values from raw values.
#[derive(Debug, Clone, Copy)]
pub struct CanonicalizationEngine<'a> {
    synonyms: &'a SynonymMap,
}

impl<'a> CanonicalizationEngine<'a> {
    /// Creates an engine over a loaded synonym map.
    #[must_use]
    pub fn new(synonyms: &'a SynonymMap) -> Self {
        Self { synonyms }
    }

    /// Resolves one raw value without touching storage.
    ///
    /// # Examples
    ///
    /// ```
    /// use pharmacanon::{CanonicalizationEngine, Domain, ResolutionSource, SynonymMap};
    ///
    /// let synonyms = SynonymMap::curated().unwrap();
    /// let engine = CanonicalizationEngine::new(&synonyms);
    ///
    /// let hit = engine.resolve(Domain::Target, "LTCC");
    /// assert_eq!(hit.canonical, "l-type calcium channel");
    /// assert_eq!(hit.source, ResolutionSource::Synonym);
    ///
    /// let miss = engine.resolve(Domain::Target, " Unknown-Target-XYZ ");
    /// assert_eq!(miss.canonical, "unknown-target-xyz");
    /// assert_eq!(miss.source, ResolutionSource::PassThrough);
    /// ```
    #[must_use]
    pub fn resolve(&self, domain: Domain, raw: &str) -> Resolution {
        let normalized = normalize(raw);
        match self.synonyms.lookup(domain, &normalized) {
            Some(canonical) => Resolution {
                canonical: canonical.to_string(),
                source: ResolutionSource::Synonym,
            },
            None => Resolution {
                canonical: normalized,
                source: ResolutionSource::PassThrough,
            },
        }
    }

    /// Canonicalizes every record of the scope's domain.
    ///
    /// Writes are staged in `scope`; the caller decides whether to commit.
    ///
    /// # Errors
    /// - [`ExecutionError::DomainMismatch`] if the scope yields a record of
    ///   another domain
    /// - any storage error raised by the scope
    pub fn canonicalize(&self, scope: &mut dyn DomainScope) -> CanonResult<CanonicalizationReport> {
        let domain = scope.domain();
        let mut report = CanonicalizationReport::new(domain);

        for record in scope.records()? {
            if record.domain != domain {
                return Err(ExecutionError::DomainMismatch {
                    id: record.id,
                    expected: domain,
                    actual: record.domain,
                }
                .into());
            }
            report.examined += 1;

            let Some(raw) = record.raw_value.as_deref() else {
                report.skipped_null += 1;
                continue;
            };
            let resolution = self.resolve(domain, raw);
            match resolution.source {
                ResolutionSource::Synonym => report.synonym_hits += 1,
                ResolutionSource::PassThrough if resolution.canonical.is_empty() => {
                    report.passthrough += 1;
                    report.blank += 1;
                }
                ResolutionSource::PassThrough => {
                    report.passthrough += 1;
                    report.unmatched.insert(resolution.canonical.clone());
                }
            }

            if record.canonical_value.as_deref() == Some(resolution.canonical.as_str()) {
                report.unchanged += 1;
                continue;
            }

            tracing::debug!(
                %domain,
                id = %record.id,
                from = ?record.canonical_value,
                to = %resolution.canonical,
                "rewriting canonical value"
            );
            scope.set_canonical_value(record.id, resolution.canonical)?;
            report.updated += 1;
        }

        tracing::info!(
            %domain,
            examined = report.examined,
            updated = report.updated,
            unchanged = report.unchanged,
            synonym_hits = report.synonym_hits,
            passthrough = report.passthrough,
            unmatched = report.unmatched.len(),
            "canonicalized domain"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{CanonicalEntity, CanonicalEntityId};
    use crate::error::CanonError;
    use crate::record::{AttributeRecord, NewRecord, RecordId};
    use crate::storage::{within_scope, CanonStore, InMemoryStore, StorageError};
    use crate::synonym::SynonymEntry;

    fn seed(store: &InMemoryStore, domain: Domain, raws: &[Option<&str>]) {
        for raw in raws {
            store
                .insert_record(NewRecord {
                    domain,
                    raw_value: raw.map(str::to_string),
                })
                .unwrap();
        }
    }

    fn run(store: &InMemoryStore, synonyms: &SynonymMap, domain: Domain) -> CanonicalizationReport {
        let engine = CanonicalizationEngine::new(synonyms);
        within_scope(store, domain, |scope| engine.canonicalize(scope)).unwrap()
    }

    fn canonicals(store: &InMemoryStore, domain: Domain) -> Vec<Option<String>> {
        store
            .records(domain)
            .unwrap()
            .into_iter()
            .map(|r| r.canonical_value)
            .collect()
    }

    #[test]
    fn test_scenarios_from_curated_table() {
        let synonyms = SynonymMap::curated().unwrap();
        let engine = CanonicalizationEngine::new(&synonyms);
        assert_eq!(engine.resolve(Domain::Target, "LTCC").canonical, "l-type calcium channel");
        assert_eq!(engine.resolve(Domain::Role, "  Ингибиторы ").canonical, "ингибитор");
        assert_eq!(engine.resolve(Domain::Effect, "low blood pressure").canonical, "низкое давление");
        assert_eq!(engine.resolve(Domain::Target, "unknown-target-xyz").canonical, "unknown-target-xyz");
    }

    #[test]
    fn test_null_raw_values_are_skipped() {
        let store = InMemoryStore::new();
        seed(&store, Domain::Effect, &[None, Some("Гипотензия")]);
        let synonyms = SynonymMap::curated().unwrap();

        let report = run(&store, &synonyms, Domain::Effect);
        assert_eq!(report.examined, 2);
        assert_eq!(report.skipped_null, 1);
        assert_eq!(report.updated, 1);
        assert_eq!(
            canonicals(&store, Domain::Effect),
            vec![None, Some("низкое давление".to_string())]
        );
    }

    #[test]
    fn test_blank_raw_values_resolve_to_empty() {
        let store = InMemoryStore::new();
        seed(&store, Domain::Target, &[Some("   "), Some(""), None]);
        let report = run(&store, &SynonymMap::empty(), Domain::Target);
        assert_eq!(report.blank, 2);
        assert_eq!(report.passthrough, 2);
        assert_eq!(report.updated, 2);
        assert_eq!(report.skipped_null, 1);
        assert!(report.unmatched.is_empty());
        assert_eq!(
            canonicals(&store, Domain::Target),
            vec![Some(String::new()), Some(String::new()), None]
        );

        let again = run(&store, &SynonymMap::empty(), Domain::Target);
        assert!(again.is_noop());
        assert_eq!(again.unchanged, 2);
    }

    #[test]
    fn test_second_run_is_noop() {
        let store = InMemoryStore::new();
        seed(
            &store,
            Domain::Target,
            &[Some("LTCC"), Some("  l-VSCC "), Some("Mystery Target"), None],
        );
        let synonyms = SynonymMap::curated().unwrap();

        let first = run(&store, &synonyms, Domain::Target);
        assert_eq!(first.updated, 3);
        let after_first = store.records(Domain::Target).unwrap();

        let second = run(&store, &synonyms, Domain::Target);
        assert!(second.is_noop());
        assert_eq!(second.unchanged, 3);
        assert_eq!(store.records(Domain::Target).unwrap(), after_first);
    }

    #[test]
    fn test_exact_match_over_case_and_whitespace_variants() {
        let synonyms = SynonymMap::curated().unwrap();
        let engine = CanonicalizationEngine::new(&synonyms);
        for config in synonyms.to_config().entries {
            let variants = [
                config.variant.clone(),
                config.variant.to_uppercase(),
                format!("  {}\t", config.variant),
                config.variant.replace(' ', "   "),
            ];
            for variant in variants {
                let resolution = engine.resolve(config.domain, &variant);
                assert_eq!(resolution.canonical, config.canonical, "variant {variant:?}");
                assert_eq!(resolution.source, ResolutionSource::Synonym);
            }
        }
    }

    #[test]
    fn test_passthrough_is_stable_and_reported() {
        let store = InMemoryStore::new();
        seed(&store, Domain::Role, &[Some("  Частичный   Агонист "), Some("частичный агонист")]);
        let synonyms = SynonymMap::curated().unwrap();

        let report = run(&store, &synonyms, Domain::Role);
        assert_eq!(report.passthrough, 2);
        assert_eq!(
            report.unmatched.iter().collect::<Vec<_>>(),
            vec!["частичный агонист"]
        );
        let again = run(&store, &synonyms, Domain::Role);
        assert!(again.is_noop());
        assert_eq!(
            canonicals(&store, Domain::Role),
            vec![Some("частичный агонист".to_string()); 2]
        );
    }

    #[test]
    fn test_stale_canonical_values_are_corrected() {
        let store = InMemoryStore::new();
        seed(&store, Domain::Role, &[Some("inhibitor")]);
        let id = store.records(Domain::Role).unwrap()[0].id;
        within_scope::<_, StorageError, _>(&store, Domain::Role, |scope| {
            scope.set_canonical_value(id, "INHIBITOR".to_string())
        })
        .unwrap();

        let synonyms = SynonymMap::from_entries(
            "t",
            [SynonymEntry::new(Domain::Role, "inhibitor", "ингибитор")],
        )
        .unwrap();
        let report = run(&store, &synonyms, Domain::Role);
        assert_eq!(report.updated, 1);
        assert_eq!(canonicals(&store, Domain::Role), vec![Some("ингибитор".to_string())]);
    }

    #[test]
    fn test_canonical_output_is_always_normalized() {
        let store = InMemoryStore::new();
        seed(
            &store,
            Domain::Target,
            &[Some("H+/K+-АТФаза"), Some("  Beta-1\tAdrenoreceptor "), Some("SERT")],
        );
        let synonyms = SynonymMap::curated().unwrap();
        run(&store, &synonyms, Domain::Target);
        for value in canonicals(&store, Domain::Target).into_iter().flatten() {
            assert_eq!(normalize(&value), value);
        }
    }

    /// Store whose scopes yield one extra record from another domain after
    /// the real ones.
    struct ForeignRecordStore {
        inner: InMemoryStore,
        foreign: AttributeRecord,
    }

    struct ForeignRecordScope<'a> {
        inner: Box<dyn DomainScope + 'a>,
        foreign: AttributeRecord,
    }

    impl DomainScope for ForeignRecordScope<'_> {
        fn domain(&self) -> Domain {
            self.inner.domain()
        }

        fn records(&self) -> Result<Vec<AttributeRecord>, StorageError> {
            let mut records = self.inner.records()?;
            records.push(self.foreign.clone());
            Ok(records)
        }

        fn set_canonical_value(&mut self, id: RecordId, value: String) -> Result<(), StorageError> {
            self.inner.set_canonical_value(id, value)
        }

        fn entities(&self) -> Result<Vec<CanonicalEntity>, StorageError> {
            self.inner.entities()
        }

        fn insert_entity(&mut self, canonical_name: &str) -> Result<CanonicalEntity, StorageError> {
            self.inner.insert_entity(canonical_name)
        }

        fn commit(self: Box<Self>) -> Result<(), StorageError> {
            self.inner.commit()
        }

        fn rollback(self: Box<Self>) {
            self.inner.rollback();
        }
    }

    impl CanonStore for ForeignRecordStore {
        fn insert_record(&self, record: NewRecord) -> Result<AttributeRecord, StorageError> {
            self.inner.insert_record(record)
        }

        fn records(&self, domain: Domain) -> Result<Vec<AttributeRecord>, StorageError> {
            self.inner.records(domain)
        }

        fn entities(&self, domain: Domain) -> Result<Vec<CanonicalEntity>, StorageError> {
            self.inner.entities(domain)
        }

        fn begin(&self, domain: Domain) -> Result<Box<dyn DomainScope + '_>, StorageError> {
            Ok(Box::new(ForeignRecordScope {
                inner: self.inner.begin(domain)?,
                foreign: self.foreign.clone(),
            }))
        }

        fn retire_entity(
            &self,
            domain: Domain,
            id: CanonicalEntityId,
        ) -> Result<CanonicalEntity, StorageError> {
            self.inner.retire_entity(domain, id)
        }
    }

    #[test]
    fn test_foreign_record_aborts_and_rolls_back_domain() {
        let store = ForeignRecordStore {
            inner: InMemoryStore::new(),
            foreign: AttributeRecord::new(RecordId::new(99), Domain::Effect, Some("ulcer".into())),
        };
        seed(&store.inner, Domain::Target, &[Some("LTCC"), Some("SERT")]);
        let synonyms = SynonymMap::curated().unwrap();
        let engine = CanonicalizationEngine::new(&synonyms);

        let err = within_scope(&store, Domain::Target, |scope| engine.canonicalize(scope)).unwrap_err();
        match err {
            CanonError::Execution(ExecutionError::DomainMismatch { id, expected, actual }) => {
                assert_eq!(id, RecordId::new(99));
                assert_eq!(expected, Domain::Target);
                assert_eq!(actual, Domain::Effect);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        // both rewrites were staged before the foreign record; neither is visible
        assert_eq!(canonicals(&store.inner, Domain::Target), vec![None, None]);
    }

    #[test]
    fn test_domains_are_independent() {
        let store = InMemoryStore::new();
        seed(&store, Domain::Target, &[Some("LTCC")]);
        seed(&store, Domain::Effect, &[Some("LTCC")]);
        let synonyms = SynonymMap::curated().unwrap();

        run(&store, &synonyms, Domain::Target);
        assert_eq!(canonicals(&store, Domain::Effect), vec![None]);
        run(&store, &synonyms, Domain::Effect);
        assert_eq!(canonicals(&store, Domain::Effect), vec![Some("ltcc".to_string())]);
    }
}
