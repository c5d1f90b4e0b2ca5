pub mod config;
pub mod error;
pub mod index;
pub mod indexer;
pub mod inference;
pub mod languages;
pub mod memory;
pub mod storage;
pub mod writeback;

pub use config::{AssistantConfig, ConfigOverrides, InferenceConfig, WatchConfig};
pub use error::{AssistantError, Result};
pub use index::{
    FileIndex, FileRecord, FingerprintMap, IndexStats, IndexStore, ScanReport, UpdateOutcome,
};
pub use indexer::{
    ChangeDetector, FileWalker, FileWatcher, IndexAction, Indexer, Refresh, SourceAnalyzer,
    Staleness, WatchEvent, WatchEventKind, WatchFilter,
};
pub use inference::{Generation, InferenceClient};
pub use languages::{FileCategory, FileTypeRegistry};
pub use memory::{ConversationTurn, HistoryStore, TurnKind};
pub use storage::ContextDir;
