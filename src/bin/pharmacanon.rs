//! pharmacanon command line
//!
//! Operates on a persistent store directory. Every command prints JSON on
//! stdout; logs go to stderr (`RUST_LOG`, default `info`).

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use pharmacanon::{
    open_store, CanonStore, CanonicalEntityId, CanonicalizationEngine, Canonicalizer, Domain,
    NewRecord, PersistentConfig, PersistentStore, ResolutionSource, SynonymMap,
};

#[derive(Parser)]
#[command(name = "pharmacanon")]
#[command(about = "Canonicalize pharmacological attribute values")]
struct Args {
    /// Store directory (created if missing)
    #[arg(short, long, default_value = "pharmacanon.canon")]
    data_dir: PathBuf,

    /// Synonym config (JSON); the built-in curated table when omitted
    #[arg(short, long)]
    synonyms: Option<PathBuf>,

    /// Skip fsync after every WAL append
    #[arg(long)]
    no_sync: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Import raw attribute records from a JSON array of {domain, raw_value}
    Import {
        /// Input file
        file: PathBuf,
    },
    /// Canonicalize records and extend the entity tables
    Run {
        /// Only this domain (target, effect, role)
        #[arg(long)]
        domain: Option<Domain>,
    },
    /// List the canonical entities of a domain
    Entities {
        #[arg(long)]
        domain: Domain,
    },
    /// List raw values that no synonym entry covers
    Unmatched {
        #[arg(long)]
        domain: Option<Domain>,
    },
    /// Validate the synonym config and print its summary
    CheckSynonyms,
    /// Remove a canonical entity; its id is never handed out again
    Retire {
        #[arg(long)]
        domain: Domain,
        #[arg(long)]
        id: u64,
    },
    /// Snapshot the store and truncate its write-ahead log
    Compact,
}

#[derive(Serialize)]
struct ImportSummary {
    imported: usize,
    first_id: Option<u64>,
    last_id: Option<u64>,
}

#[derive(Serialize)]
struct UnmatchedValues {
    domain: Domain,
    values: BTreeSet<String>,
}

#[derive(Serialize)]
struct SynonymSummary {
    version: String,
    fingerprint: String,
    entries: usize,
    target: usize,
    effect: usize,
    role: usize,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let synonyms = load_synonyms(args.synonyms.as_deref())?;

    match args.command {
        Command::CheckSynonyms => print(&SynonymSummary {
            version: synonyms.version().to_string(),
            fingerprint: synonyms.fingerprint().to_string(),
            entries: synonyms.len(),
            target: synonyms.len_for(Domain::Target),
            effect: synonyms.len_for(Domain::Effect),
            role: synonyms.len_for(Domain::Role),
        }),
        Command::Import { file } => {
            let store = open(&args.data_dir, args.no_sync)?;
            let text = fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let records: Vec<NewRecord> = serde_json::from_str(&text)
                .with_context(|| format!("failed to parse {}", file.display()))?;

            let mut ids = Vec::with_capacity(records.len());
            for record in records {
                ids.push(store.insert_record(record)?.id.get());
            }
            print(&ImportSummary {
                imported: ids.len(),
                first_id: ids.first().copied(),
                last_id: ids.last().copied(),
            })
        }
        Command::Run { domain } => {
            let store = open(&args.data_dir, args.no_sync)?;
            let canonicalizer = Canonicalizer::new(Arc::new(synonyms));
            let reports = match domain {
                Some(domain) => vec![canonicalizer.run_domain(&store, domain)?],
                None => canonicalizer.run_all(&store)?,
            };
            print(&reports)
        }
        Command::Entities { domain } => {
            let store = open(&args.data_dir, args.no_sync)?;
            print(&store.entities(domain)?)
        }
        Command::Unmatched { domain } => {
            let store = open(&args.data_dir, args.no_sync)?;
            let engine = CanonicalizationEngine::new(&synonyms);
            let domains = domain.map_or_else(|| Domain::ALL.to_vec(), |d| vec![d]);

            let mut out = Vec::with_capacity(domains.len());
            for domain in domains {
                let values = store
                    .records(domain)?
                    .into_iter()
                    .filter_map(|r| r.raw_value)
                    .map(|raw| engine.resolve(domain, &raw))
                    .filter(|r| r.source == ResolutionSource::PassThrough && !r.canonical.is_empty())
                    .map(|r| r.canonical)
                    .collect();
                out.push(UnmatchedValues { domain, values });
            }
            print(&out)
        }
        Command::Retire { domain, id } => {
            let store = open(&args.data_dir, args.no_sync)?;
            print(&store.retire_entity(domain, CanonicalEntityId::new(id))?)
        }
        Command::Compact => {
            let store = open(&args.data_dir, args.no_sync)?;
            store.compact()?;
            print(&serde_json::json!({ "wal_sequence": store.wal_sequence()? }))
        }
    }
}

fn load_synonyms(path: Option<&Path>) -> Result<SynonymMap> {
    match path {
        Some(path) => SynonymMap::from_path(path)
            .with_context(|| format!("invalid synonym config {}", path.display())),
        None => SynonymMap::curated().context("built-in synonym table is invalid"),
    }
}

fn open(dir: &Path, no_sync: bool) -> Result<PersistentStore> {
    let config = PersistentConfig {
        sync_on_write: !no_sync,
        ..PersistentConfig::default()
    };
    open_store(dir, Some(config)).with_context(|| format!("failed to open store {}", dir.display()))
}

fn print<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
