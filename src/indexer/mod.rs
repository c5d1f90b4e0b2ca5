pub mod analyzer;
pub mod detector;
pub mod hasher;
pub mod incremental;
pub mod walker;
pub mod watcher;

pub use analyzer::{SourceAnalyzer, SourceSummary};
pub use detector::{ChangeDetector, Staleness};
pub use hasher::{fingerprint_bytes, read_fingerprinted};
pub use incremental::{Indexer, Refresh};
pub use walker::{relative_key, FileWalker, IGNORED_DIRS};
pub use watcher::{FileWatcher, IndexAction, WatchEvent, WatchEventKind, WatchFilter};
