use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::index::{FileRecord, MAX_EXTRACTED_LINES, PREVIEW_LINES};
use crate::languages::FileTypeRegistry;

/// Import-like and declaration-like lines found in one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceSummary {
    pub imports: Vec<String>,
    pub declarations: Vec<String>,
}

/// Builds [`FileRecord`]s using the per-category line heuristics.
pub struct SourceAnalyzer {
    registry: FileTypeRegistry,
}

impl SourceAnalyzer {
    pub fn new(registry: FileTypeRegistry) -> Self {
        Self { registry }
    }

    /// Scans `content` line by line; each list keeps its first
    /// [`MAX_EXTRACTED_LINES`] matches in file order.
    pub fn analyze(&self, content: &str, extension: &str) -> SourceSummary {
        let Some(category) = self.registry.get_by_extension(extension) else {
            return SourceSummary::default();
        };

        let mut summary = SourceSummary::default();
        for line in content.split('\n') {
            let line = line.trim();
            if summary.imports.len() < MAX_EXTRACTED_LINES && category.is_import(line) {
                summary.imports.push(line.to_string());
            }
            if summary.declarations.len() < MAX_EXTRACTED_LINES && category.is_declaration(line)
            {
                summary.declarations.push(line.to_string());
            }
            if summary.imports.len() >= MAX_EXTRACTED_LINES
                && summary.declarations.len() >= MAX_EXTRACTED_LINES
            {
                break;
            }
        }
        summary
    }

    /// Builds the record for `path` from bytes already read from it.
    ///
    /// Returns `None` for unsupported suffixes, content that is not UTF-8,
    /// or when file metadata cannot be read.
    pub fn build_record(&self, path: &Path, bytes: Vec<u8>) -> Option<FileRecord> {
        let ext = path.extension().and_then(|e| e.to_str())?;
        self.registry.get_by_extension(ext)?;

        let content = match String::from_utf8(bytes) {
            Ok(content) => content,
            Err(_) => {
                debug!("Skipping non-UTF-8 file {}", path.display());
                return None;
            }
        };

        let modified = match fs::metadata(path).and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(e) => {
                debug!("Cannot stat {}: {}", path.display(), e);
                return None;
            }
        };

        let summary = self.analyze(&content, ext);
        let lines: Vec<&str> = content.split('\n').collect();

        Some(FileRecord {
            size: content.len() as u64,
            lines: lines.len(),
            extension: format!(".{}", ext),
            imports: summary.imports,
            functions: summary.declarations,
            last_modified: DateTime::<Utc>::from(modified),
            preview: lines
                .iter()
                .take(PREVIEW_LINES)
                .copied()
                .collect::<Vec<_>>()
                .join("\n"),
        })
    }
}

impl Default for SourceAnalyzer {
    fn default() -> Self {
        Self::new(FileTypeRegistry::new())
    }
}
