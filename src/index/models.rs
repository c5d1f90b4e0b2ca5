use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum number of import or declaration lines kept per file.
pub const MAX_EXTRACTED_LINES: usize = 10;

/// Number of leading lines kept as a preview.
pub const PREVIEW_LINES: usize = 5;

/// Cached metadata for one indexed file, keyed by its relative path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileRecord {
    /// Size in bytes
    pub size: u64,
    /// Number of `\n`-separated segments
    pub lines: usize,
    /// Original suffix including the dot, e.g. `.py`
    pub extension: String,
    pub imports: Vec<String>,
    /// Declaration-like lines (functions, classes, arrow bindings)
    pub functions: Vec<String>,
    #[serde(deserialize_with = "crate::storage::deserialize_timestamp")]
    pub last_modified: DateTime<Utc>,
    pub preview: String,
}

/// Relative path -> record. Sorted so persisted documents are stable.
pub type FileIndex = BTreeMap<String, FileRecord>;

/// Relative path -> hex content fingerprint.
pub type FingerprintMap = BTreeMap<String, String>;

/// Outcome of a full rescan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Files whose record was (re)computed
    pub analyzed: usize,
    /// Files whose fingerprint matched and whose record was kept
    pub reused: usize,
    /// Files that could not be hashed or read as text
    pub skipped: usize,
    /// Previously indexed paths that are gone
    pub removed: usize,
}

impl ScanReport {
    pub fn total_indexed(&self) -> usize {
        self.analyzed + self.reused
    }
}

/// Outcome of a single-file update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Updated,
    Unchanged,
    Removed,
    Skipped,
}

impl UpdateOutcome {
    pub fn is_change(&self) -> bool {
        matches!(self, UpdateOutcome::Updated | UpdateOutcome::Removed)
    }
}

/// Per-category counts shown by `status`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexStats {
    pub total_files: usize,
    pub total_lines: usize,
    pub total_bytes: u64,
    pub files_by_extension: Vec<(String, usize)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FileRecord {
        FileRecord {
            size: 14,
            lines: 2,
            extension: ".py".to_string(),
            imports: vec![],
            functions: vec!["def f(): pass".to_string()],
            last_modified: DateTime::parse_from_rfc3339("2024-05-01T10:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
            preview: "def f(): pass\n".to_string(),
        }
    }

    #[test]
    fn test_record_json_field_names() {
        let json = serde_json::to_value(sample()).unwrap();
        let obj = json.as_object().unwrap();
        for key in [
            "size",
            "lines",
            "extension",
            "imports",
            "functions",
            "last_modified",
            "preview",
        ] {
            assert!(obj.contains_key(key), "missing {}", key);
        }
        assert_eq!(obj["last_modified"], "2024-05-01T10:00:00Z");
    }

    #[test]
    fn test_record_rejects_unknown_fields() {
        let mut json = serde_json::to_value(sample()).unwrap();
        json["bogus"] = serde_json::json!(1);
        assert!(serde_json::from_value::<FileRecord>(json).is_err());
    }

    #[test]
    fn test_record_accepts_offset_less_last_modified() {
        let mut json = serde_json::to_value(sample()).unwrap();
        json["last_modified"] = serde_json::json!("2024-05-01T10:00:00.250000");

        let record: FileRecord = serde_json::from_value(json).unwrap();
        assert_eq!(
            record.last_modified.to_rfc3339(),
            "2024-05-01T10:00:00.250+00:00"
        );
        assert_eq!(
            serde_json::to_value(&record).unwrap()["last_modified"],
            "2024-05-01T10:00:00.250Z"
        );
    }

    #[test]
    fn test_update_outcome_is_change() {
        assert!(UpdateOutcome::Updated.is_change());
        assert!(UpdateOutcome::Removed.is_change());
        assert!(!UpdateOutcome::Unchanged.is_change());
        assert!(!UpdateOutcome::Skipped.is_change());
    }
}
