use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::error::Result;
use crate::index::{FileIndex, FileRecord, FingerprintMap, IndexStats};
use crate::storage::{self, ContextDir};

/// The file index and its fingerprint map, loaded into memory.
///
/// Both maps are only mutated together through this type, and only the owner
/// of the value writes them back to disk. `save` writes the index first and
/// the fingerprints second; [`IndexStore::open`] reconciles the pair so an
/// interrupted save can only cause extra re-analysis on the next scan.
#[derive(Debug, Clone)]
pub struct IndexStore {
    context: ContextDir,
    records: FileIndex,
    fingerprints: FingerprintMap,
    fingerprints_persisted: bool,
}

impl IndexStore {
    pub fn empty(context: ContextDir) -> Self {
        Self {
            context,
            records: BTreeMap::new(),
            fingerprints: BTreeMap::new(),
            fingerprints_persisted: false,
        }
    }

    /// Loads both documents, failing with `CorruptStore` if either is malformed.
    pub fn open(context: ContextDir) -> Result<Self> {
        let records: Option<FileIndex> = storage::read_document(&context.index_path())?;
        let fingerprints: Option<FingerprintMap> =
            storage::read_document(&context.fingerprints_path())?;

        let fingerprints_persisted = fingerprints.is_some();
        let records = records.unwrap_or_default();
        let mut fingerprints = fingerprints.unwrap_or_default();

        let before = fingerprints.len();
        fingerprints.retain(|path, _| records.contains_key(path));
        if fingerprints.len() != before {
            warn!(
                "Dropped {} fingerprints without an index record",
                before - fingerprints.len()
            );
        }

        debug!(
            "Loaded index with {} records and {} fingerprints",
            records.len(),
            fingerprints.len()
        );

        Ok(Self {
            context,
            records,
            fingerprints,
            fingerprints_persisted,
        })
    }

    /// Writes the index document, then the fingerprint document.
    pub fn save(&mut self) -> Result<()> {
        self.context.ensure()?;
        storage::write_document(&self.context.index_path(), &self.records)?;
        storage::write_document(&self.context.fingerprints_path(), &self.fingerprints)?;
        self.fingerprints_persisted = true;
        Ok(())
    }

    /// Deletes both documents from disk and empties the in-memory maps.
    pub fn clear(&mut self) -> Result<()> {
        storage::remove_document(&self.context.fingerprints_path())?;
        storage::remove_document(&self.context.index_path())?;
        self.records.clear();
        self.fingerprints.clear();
        self.fingerprints_persisted = false;
        Ok(())
    }

    pub fn context(&self) -> &ContextDir {
        &self.context
    }

    /// Whether a fingerprint document existed when this store was opened
    /// or has been written since.
    pub fn has_persisted_fingerprints(&self) -> bool {
        self.fingerprints_persisted
    }

    pub fn records(&self) -> &FileIndex {
        &self.records
    }

    pub fn fingerprints(&self) -> &FingerprintMap {
        &self.fingerprints
    }

    pub fn record(&self, path: &str) -> Option<&FileRecord> {
        self.records.get(path)
    }

    pub fn fingerprint(&self, path: &str) -> Option<&str> {
        self.fingerprints.get(path).map(|s| s.as_str())
    }

    /// The record for `path` if it was computed from content with this fingerprint.
    pub fn current_record(&self, path: &str, fingerprint: &str) -> Option<&FileRecord> {
        match self.fingerprints.get(path) {
            Some(stored) if stored == fingerprint => self.records.get(path),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(|k| k.as_str())
    }

    /// Replaces both maps wholesale, as produced by a full rescan.
    pub fn replace_all(&mut self, records: FileIndex, fingerprints: FingerprintMap) {
        self.records = records;
        self.fingerprints = fingerprints;
    }

    pub fn upsert(&mut self, path: String, record: FileRecord, fingerprint: String) {
        self.fingerprints.insert(path.clone(), fingerprint);
        self.records.insert(path, record);
    }

    /// Removes a path from both maps. Returns whether anything was removed.
    pub fn remove(&mut self, path: &str) -> bool {
        let had_record = self.records.remove(path).is_some();
        let had_fingerprint = self.fingerprints.remove(path).is_some();
        had_record || had_fingerprint
    }

    pub fn stats(&self) -> IndexStats {
        let mut by_ext: BTreeMap<String, usize> = BTreeMap::new();
        let mut total_lines = 0;
        let mut total_bytes = 0;
        for record in self.records.values() {
            *by_ext.entry(record.extension.to_ascii_lowercase()).or_default() += 1;
            total_lines += record.lines;
            total_bytes += record.size;
        }

        let mut files_by_extension: Vec<(String, usize)> = by_ext.into_iter().collect();
        files_by_extension.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        IndexStats {
            total_files: self.records.len(),
            total_lines,
            total_bytes,
            files_by_extension,
        }
    }
}
