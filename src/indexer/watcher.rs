use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver};
use std::time::{Duration, Instant};

use notify::event::{CreateKind, ModifyKind, RemoveKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, warn};

use crate::error::{AssistantError, Result};
use crate::indexer::walker::FileWalker;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchEventKind {
    Created,
    Modified,
    Deleted,
}

/// A filesystem change under the watched root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub kind: WatchEventKind,
    pub path: PathBuf,
    pub is_dir: bool,
}

impl WatchEvent {
    pub fn file(kind: WatchEventKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
            is_dir: false,
        }
    }
}

/// What the index owner should do in response to an accepted event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexAction {
    Update(PathBuf),
    Remove(PathBuf),
}

/// Receives OS notifications on the watcher's own thread and hands them
/// to whoever calls [`FileWatcher::recv`].
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    receiver: Receiver<notify::Result<Event>>,
}

impl FileWatcher {
    pub fn new(path: &Path) -> Result<Self> {
        let (tx, rx) = channel();

        let mut watcher =
            notify::recommended_watcher(tx).map_err(|e| AssistantError::Watcher(e.to_string()))?;

        watcher
            .watch(path, RecursiveMode::Recursive)
            .map_err(|e| AssistantError::Watcher(e.to_string()))?;

        Ok(Self {
            _watcher: watcher,
            receiver: rx,
        })
    }

    /// Blocks for the next notification. Returns `None` once the watcher is gone.
    pub fn recv(&self) -> Option<Vec<WatchEvent>> {
        match self.receiver.recv() {
            Ok(result) => Some(Self::unpack(result)),
            Err(_) => None,
        }
    }

    fn unpack(result: notify::Result<Event>) -> Vec<WatchEvent> {
        match result {
            Ok(event) => translate_event(&event),
            Err(e) => {
                warn!("Watcher error: {}", e);
                Vec::new()
            }
        }
    }
}

/// Maps a raw notify event to zero or more [`WatchEvent`]s.
///
/// A path that no longer exists cannot be inspected, so removals and
/// renames away are reported as files unless the backend says
/// `RemoveKind::Folder`. When a directory leaves the tree its indexed
/// children stay in the index until the next change detection pass.
pub fn translate_event(event: &Event) -> Vec<WatchEvent> {
    let make = |kind: WatchEventKind, path: &PathBuf, is_dir: bool| WatchEvent {
        kind,
        path: path.clone(),
        is_dir,
    };
    let gone = |path: &PathBuf| {
        debug!("{} is gone; treating it as a file", path.display());
        make(WatchEventKind::Deleted, path, false)
    };

    match &event.kind {
        EventKind::Create(kind) => event
            .paths
            .iter()
            .map(|p| {
                let is_dir = matches!(kind, CreateKind::Folder) || p.is_dir();
                make(WatchEventKind::Created, p, is_dir)
            })
            .collect(),
        EventKind::Remove(RemoveKind::Folder) => event
            .paths
            .iter()
            .map(|p| make(WatchEventKind::Deleted, p, true))
            .collect(),
        EventKind::Remove(_) => event.paths.iter().map(gone).collect(),
        EventKind::Modify(ModifyKind::Metadata(_)) => Vec::new(),
        EventKind::Modify(ModifyKind::Name(mode)) => match (mode, event.paths.as_slice()) {
            (RenameMode::Both, [from, to]) => vec![
                gone(from),
                make(WatchEventKind::Created, to, to.is_dir()),
            ],
            (RenameMode::From, paths) => paths.iter().map(gone).collect(),
            (RenameMode::To, paths) => paths
                .iter()
                .map(|p| make(WatchEventKind::Created, p, p.is_dir()))
                .collect(),
            (_, paths) => paths
                .iter()
                .map(|p| {
                    if p.exists() {
                        make(WatchEventKind::Modified, p, p.is_dir())
                    } else {
                        gone(p)
                    }
                })
                .collect(),
        },
        EventKind::Modify(_) => event
            .paths
            .iter()
            .map(|p| make(WatchEventKind::Modified, p, p.is_dir()))
            .collect(),
        _ => Vec::new(),
    }
}

/// Decides which watch events reach the index.
///
/// Directory events and paths outside the indexable set are dropped. A
/// modified event arriving within `debounce` of the last accepted modified
/// event is suppressed; created and deleted events always pass.
pub struct WatchFilter {
    root: PathBuf,
    walker: FileWalker,
    debounce: Duration,
    last_modified: Option<Instant>,
}

impl WatchFilter {
    pub fn new(root: impl Into<PathBuf>, debounce: Duration) -> Self {
        Self {
            root: root.into(),
            walker: FileWalker::default(),
            debounce,
            last_modified: None,
        }
    }

    pub fn accept(&mut self, event: WatchEvent, now: Instant) -> Option<IndexAction> {
        if event.is_dir || !self.walker.is_indexable(&self.root, &event.path) {
            return None;
        }

        match event.kind {
            WatchEventKind::Created => Some(IndexAction::Update(event.path)),
            WatchEventKind::Deleted => Some(IndexAction::Remove(event.path)),
            WatchEventKind::Modified => {
                if let Some(last) = self.last_modified {
                    if now.saturating_duration_since(last) < self.debounce {
                        debug!("Debounced change to {}", event.path.display());
                        return None;
                    }
                }
                self.last_modified = Some(now);
                Some(IndexAction::Update(event.path))
            }
        }
    }
}
