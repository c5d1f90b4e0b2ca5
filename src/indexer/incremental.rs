use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::error::{AssistantError, Result};
use crate::index::{FileIndex, FileRecord, FingerprintMap, IndexStore, ScanReport, UpdateOutcome};
use crate::indexer::analyzer::SourceAnalyzer;
use crate::indexer::detector::{ChangeDetector, Staleness};
use crate::indexer::hasher::read_fingerprinted;
use crate::indexer::walker::{relative_key, FileWalker};
use crate::indexer::watcher::IndexAction;
use crate::storage::ContextDir;

/// Result of bringing the index up to date at the start of a command.
#[derive(Debug)]
pub struct Refresh {
    pub store: IndexStore,
    pub staleness: Staleness,
    pub report: Option<ScanReport>,
}

enum ScanOutcome {
    Reused(FileRecord, String),
    Analyzed(FileRecord, String),
    Skipped,
}

/// Owns the project root and drives full and single-file indexing.
pub struct Indexer {
    root: PathBuf,
    context: ContextDir,
    walker: FileWalker,
    analyzer: SourceAnalyzer,
}

impl Indexer {
    /// `root` is canonicalized so paths reported by the watcher match.
    pub fn new(root: &Path) -> Result<Self> {
        let root = root.canonicalize()?;
        let context = ContextDir::new(&root);
        Ok(Self {
            root,
            context,
            walker: FileWalker::default(),
            analyzer: SourceAnalyzer::default(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn context(&self) -> &ContextDir {
        &self.context
    }

    /// Opens the persisted store; a corrupt store is discarded and replaced
    /// by an empty one so the next scan rebuilds it.
    pub fn open_store(&self) -> Result<IndexStore> {
        match IndexStore::open(self.context.clone()) {
            Ok(store) => Ok(store),
            Err(e @ AssistantError::CorruptStore { .. }) => {
                warn!("{}; rebuilding index from scratch", e);
                Ok(IndexStore::empty(self.context.clone()))
            }
            Err(e) => Err(e),
        }
    }

    pub fn detect(&self, store: &IndexStore) -> Staleness {
        ChangeDetector::new(&self.walker).detect(&self.root, store)
    }

    /// Opens the store and rescans if anything changed since the last scan.
    pub fn refresh(&self) -> Result<Refresh> {
        let mut store = self.open_store()?;
        let staleness = self.detect(&store);

        let report = if staleness.needs_rescan() {
            info!("Index is stale ({}), rescanning", staleness);
            Some(self.full_rescan(&mut store)?)
        } else {
            debug!("Index is up to date");
            None
        };

        Ok(Refresh {
            store,
            staleness,
            report,
        })
    }

    /// Rebuilds both maps from a walk of the tree and persists them.
    ///
    /// Files whose fingerprint matches the stored one keep their record;
    /// everything else is re-analyzed. Paths not seen in the walk are dropped.
    pub fn full_rescan(&self, store: &mut IndexStore) -> Result<ScanReport> {
        let files = self.walker.walk(&self.root);
        debug!("Found {} candidate files", files.len());

        let snapshot: &IndexStore = store;
        let outcomes: Vec<(String, ScanOutcome)> = files
            .par_iter()
            .filter_map(|path| {
                let key = relative_key(&self.root, path).ok()?;
                let outcome = self.scan_file(snapshot, &key, path);
                Some((key, outcome))
            })
            .collect();

        let mut records = FileIndex::new();
        let mut fingerprints = FingerprintMap::new();
        let mut report = ScanReport::default();

        for (key, outcome) in outcomes {
            match outcome {
                ScanOutcome::Reused(record, fingerprint) => {
                    report.reused += 1;
                    fingerprints.insert(key.clone(), fingerprint);
                    records.insert(key, record);
                }
                ScanOutcome::Analyzed(record, fingerprint) => {
                    report.analyzed += 1;
                    fingerprints.insert(key.clone(), fingerprint);
                    records.insert(key, record);
                }
                ScanOutcome::Skipped => report.skipped += 1,
            }
        }

        report.removed = store
            .paths()
            .filter(|path| !records.contains_key(*path))
            .count();

        store.replace_all(records, fingerprints);
        store.save()?;

        info!(
            "Indexed {} files ({} analyzed, {} unchanged, {} skipped, {} removed)",
            report.total_indexed(),
            report.analyzed,
            report.reused,
            report.skipped,
            report.removed
        );

        Ok(report)
    }

    fn scan_file(&self, store: &IndexStore, key: &str, path: &Path) -> ScanOutcome {
        let Some((bytes, fingerprint)) = read_fingerprinted(path) else {
            return ScanOutcome::Skipped;
        };

        if let Some(record) = store.current_record(key, &fingerprint) {
            return ScanOutcome::Reused(record.clone(), fingerprint);
        }

        debug!("Indexing: {}", key);
        match self.analyzer.build_record(path, bytes) {
            Some(record) => ScanOutcome::Analyzed(record, fingerprint),
            None => ScanOutcome::Skipped,
        }
    }

    /// Recomputes one path's record and fingerprint, or removes them if the
    /// path is gone or no longer indexable. Does not persist.
    pub fn update_file(&self, store: &mut IndexStore, path: &Path) -> Result<UpdateOutcome> {
        let key = relative_key(&self.root, path)?;

        if !path.is_file() || !self.walker.is_indexable(&self.root, path) {
            return Ok(removal_outcome(store.remove(&key)));
        }

        let Some((bytes, fingerprint)) = read_fingerprinted(path) else {
            warn!("Cannot read {}, leaving its entry as is", key);
            return Ok(UpdateOutcome::Skipped);
        };

        if store.current_record(&key, &fingerprint).is_some() {
            return Ok(UpdateOutcome::Unchanged);
        }

        match self.analyzer.build_record(path, bytes) {
            Some(record) => {
                store.upsert(key, record, fingerprint);
                Ok(UpdateOutcome::Updated)
            }
            None if store.remove(&key) => Ok(UpdateOutcome::Removed),
            None => Ok(UpdateOutcome::Skipped),
        }
    }

    /// Drops one path from the store. Idempotent. Does not persist.
    pub fn remove_file(&self, store: &mut IndexStore, path: &Path) -> Result<UpdateOutcome> {
        let key = relative_key(&self.root, path)?;
        Ok(removal_outcome(store.remove(&key)))
    }

    pub fn apply(&self, store: &mut IndexStore, action: &IndexAction) -> Result<UpdateOutcome> {
        match action {
            IndexAction::Update(path) => self.update_file(store, path),
            IndexAction::Remove(path) => self.remove_file(store, path),
        }
    }
}

fn removal_outcome(removed: bool) -> UpdateOutcome {
    if removed {
        UpdateOutcome::Removed
    } else {
        UpdateOutcome::Unchanged
    }
}
