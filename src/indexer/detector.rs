use std::path::Path;

use tracing::debug;

use crate::index::IndexStore;
use crate::indexer::hasher::read_fingerprinted;
use crate::indexer::walker::{relative_key, FileWalker};

/// Why the index does or does not need a rescan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Staleness {
    /// No fingerprint document has ever been written.
    NoFingerprints,
    /// A file's content differs from its fingerprint, or it has none.
    Changed(String),
    /// A previously indexed path is gone from disk.
    Deleted(String),
    Fresh,
}

impl Staleness {
    pub fn needs_rescan(&self) -> bool {
        !matches!(self, Staleness::Fresh)
    }
}

impl std::fmt::Display for Staleness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Staleness::NoFingerprints => write!(f, "no fingerprints stored"),
            Staleness::Changed(path) => write!(f, "changed: {}", path),
            Staleness::Deleted(path) => write!(f, "deleted: {}", path),
            Staleness::Fresh => write!(f, "up to date"),
        }
    }
}

/// Coarse whole-tree invalidation: reports the first difference found.
pub struct ChangeDetector<'a> {
    walker: &'a FileWalker,
}

impl<'a> ChangeDetector<'a> {
    pub fn new(walker: &'a FileWalker) -> Self {
        Self { walker }
    }

    pub fn detect(&self, root: &Path, store: &IndexStore) -> Staleness {
        if !store.has_persisted_fingerprints() {
            return Staleness::NoFingerprints;
        }

        for path in self.walker.files(root) {
            let Ok(key) = relative_key(root, &path) else {
                continue;
            };
            let Some((bytes, current)) = read_fingerprinted(&path) else {
                continue;
            };
            match store.fingerprint(&key) {
                Some(stored) if stored == current => {}
                // Never indexed because it is not text; a rescan would skip it again.
                None if std::str::from_utf8(&bytes).is_err() => {}
                _ => {
                    debug!("Change detected in {}", key);
                    return Staleness::Changed(key);
                }
            }
        }

        for key in store.fingerprints().keys() {
            if !root.join(key).exists() {
                debug!("Deletion detected for {}", key);
                return Staleness::Deleted(key.clone());
            }
        }

        // A record whose fingerprint was lost in an interrupted save.
        if let Some(key) = store
            .paths()
            .find(|path| store.fingerprint(path).is_none())
        {
            return Staleness::Changed(key.to_string());
        }

        Staleness::Fresh
    }
}
