//! On-disk layout of the `.ai-context` directory and JSON document I/O.
//!
//! Every document is written to a sibling temp file and renamed into place,
//! so a reader never observes a half-written document.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{AssistantError, Result};

pub const CONTEXT_DIR: &str = ".ai-context";
pub const INDEX_FILE: &str = "codebase_index.json";
pub const FINGERPRINTS_FILE: &str = "file_hashes.json";
pub const HISTORY_FILE: &str = "conversation_history.json";
pub const CONFIG_FILE: &str = "config.toml";

/// Locations of all persisted state for one project root.
#[derive(Debug, Clone)]
pub struct ContextDir {
    root: PathBuf,
    dir: PathBuf,
}

impl ContextDir {
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref().to_path_buf();
        let dir = root.join(CONTEXT_DIR);
        Self { root, dir }
    }

    /// Creates the context directory if needed.
    pub fn ensure(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn index_path(&self) -> PathBuf {
        self.dir.join(INDEX_FILE)
    }

    pub fn fingerprints_path(&self) -> PathBuf {
        self.dir.join(FINGERPRINTS_FILE)
    }

    pub fn history_path(&self) -> PathBuf {
        self.dir.join(HISTORY_FILE)
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.join(CONFIG_FILE)
    }
}

/// Reads and validates a JSON document.
///
/// Returns `Ok(None)` when the file does not exist and
/// [`AssistantError::CorruptStore`] when it exists but does not parse into `T`.
pub fn read_document<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|e| AssistantError::CorruptStore {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

/// Serializes `value` as pretty JSON and atomically replaces `path`.
pub fn write_document<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut json = serde_json::to_string_pretty(value)?;
    json.push('\n');

    let tmp = temp_path(path);
    {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Removes a document; missing files are not an error.
pub fn remove_document(path: &Path) -> Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Parses an RFC 3339 timestamp, or an ISO-8601 one without an offset,
/// which is taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// `deserialize_with` adapter for [`parse_timestamp`]. Timestamps are
/// always written back as RFC 3339.
pub fn deserialize_timestamp<'de, D>(
    deserializer: D,
) -> std::result::Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp `{}`", raw)))
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    #[test]
    fn test_context_dir_layout() {
        let ctx = ContextDir::new("/project");
        assert_eq!(ctx.dir(), Path::new("/project/.ai-context"));
        assert_eq!(
            ctx.index_path(),
            Path::new("/project/.ai-context/codebase_index.json")
        );
        assert_eq!(
            ctx.fingerprints_path(),
            Path::new("/project/.ai-context/file_hashes.json")
        );
        assert_eq!(
            ctx.history_path(),
            Path::new("/project/.ai-context/conversation_history.json")
        );
    }

    #[test]
    fn test_read_missing_document() {
        let temp_dir = TempDir::new().unwrap();
        let result: Option<BTreeMap<String, String>> =
            read_document(&temp_dir.path().join("nope.json")).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_write_then_read_document() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested/doc.json");
        let mut doc = BTreeMap::new();
        doc.insert("b".to_string(), "2".to_string());
        doc.insert("a".to_string(), "1".to_string());

        write_document(&path, &doc).unwrap();
        let loaded: BTreeMap<String, String> = read_document(&path).unwrap().unwrap();
        assert_eq!(loaded, doc);
        assert!(!temp_dir.path().join("nested/doc.json.tmp").exists());
    }

    #[test]
    fn test_corrupt_document_is_reported() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("doc.json");
        fs::write(&path, "{ not json").unwrap();

        let err = read_document::<BTreeMap<String, String>>(&path).unwrap_err();
        assert!(matches!(err, AssistantError::CorruptStore { .. }));
    }

    #[test]
    fn test_wrong_shape_is_corrupt() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("doc.json");
        fs::write(&path, "[1, 2, 3]").unwrap();

        let err = read_document::<BTreeMap<String, String>>(&path).unwrap_err();
        assert!(matches!(err, AssistantError::CorruptStore { .. }));
    }

    #[test]
    fn test_parse_timestamp_forms() {
        let utc = parse_timestamp("2024-05-01T10:00:00Z").unwrap();
        assert_eq!(utc.to_rfc3339(), "2024-05-01T10:00:00+00:00");

        let offset = parse_timestamp("2024-05-01T12:00:00+02:00").unwrap();
        assert_eq!(offset, utc);

        let naive = parse_timestamp("2024-05-01T10:00:00").unwrap();
        assert_eq!(naive, utc);

        let micros = parse_timestamp("2024-05-01T10:00:00.123456").unwrap();
        assert_eq!(micros.timestamp_subsec_micros(), 123456);
        assert_eq!(micros.timestamp(), utc.timestamp());
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert!(parse_timestamp("yesterday").is_none());
        assert!(parse_timestamp("2024-05-01").is_none());
        assert!(parse_timestamp("").is_none());
    }

    #[test]
    fn test_remove_document_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("doc.json");
        fs::write(&path, "{}").unwrap();
        assert!(remove_document(&path).unwrap());
        assert!(!remove_document(&path).unwrap());
    }
}
