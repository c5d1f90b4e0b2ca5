use std::path::{Component, Path, PathBuf};

use ignore::{DirEntry, WalkBuilder};
use tracing::debug;

use crate::error::{AssistantError, Result};
use crate::languages::FileTypeRegistry;

/// Dependency and cache directories never descended into, in addition to
/// every directory whose name starts with a dot.
pub const IGNORED_DIRS: &[&str] = &["node_modules", "__pycache__", "venv", "env"];

pub struct FileWalker {
    registry: FileTypeRegistry,
}

impl FileWalker {
    pub fn new(registry: FileTypeRegistry) -> Self {
        Self { registry }
    }

    /// Lazily yields supported files under `root` in a stable order.
    ///
    /// `.gitignore` rules are not consulted; only dot-directories and
    /// [`IGNORED_DIRS`] are pruned. Entries that cannot be read are logged
    /// and skipped.
    pub fn files<'a>(&'a self, root: &Path) -> impl Iterator<Item = PathBuf> + 'a {
        WalkBuilder::new(root)
            .hidden(false)
            .git_ignore(false)
            .git_global(false)
            .git_exclude(false)
            .ignore(false)
            .parents(false)
            .sort_by_file_name(|a, b| a.cmp(b))
            .filter_entry(|entry| !is_pruned_dir(entry))
            .build()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    debug!("Skipping unreadable entry: {}", e);
                    None
                }
            })
            .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
            .map(|entry| entry.into_path())
            .filter(move |path| self.is_supported(path))
    }

    pub fn walk(&self, root: &Path) -> Vec<PathBuf> {
        self.files(root).collect()
    }

    pub fn is_supported(&self, path: &Path) -> bool {
        self.registry.get_for_file(path).is_some()
    }

    /// Whether `path` would be picked up by a walk of `root`.
    pub fn is_indexable(&self, root: &Path, path: &Path) -> bool {
        let Ok(rel) = path.strip_prefix(root) else {
            return false;
        };
        let mut components: Vec<Component> = rel.components().collect();
        if components.pop().is_none() {
            return false;
        }
        let in_pruned_dir = components.iter().any(|c| match c {
            Component::Normal(name) => name.to_str().map(is_pruned_name).unwrap_or(true),
            Component::CurDir => false,
            _ => true,
        });
        !in_pruned_dir && self.is_supported(path)
    }
}

impl Default for FileWalker {
    fn default() -> Self {
        Self::new(FileTypeRegistry::new())
    }
}

/// Index key for `path`: its location relative to `root`, `/`-separated.
pub fn relative_key(root: &Path, path: &Path) -> Result<String> {
    let rel = path
        .strip_prefix(root)
        .map_err(|_| AssistantError::OutsideRoot(path.to_path_buf()))?;

    let parts: Vec<String> = rel
        .components()
        .filter_map(|c| match c {
            Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    if parts.is_empty() {
        return Err(AssistantError::OutsideRoot(path.to_path_buf()));
    }
    Ok(parts.join("/"))
}

fn is_pruned_dir(entry: &DirEntry) -> bool {
    if entry.depth() == 0 {
        return false;
    }
    let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
    is_dir && entry.file_name().to_str().map(is_pruned_name).unwrap_or(false)
}

fn is_pruned_name(name: &str) -> bool {
    name.starts_with('.') || IGNORED_DIRS.contains(&name)
}
