//! Writing a generated code block back into the project.

use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::info;

use crate::error::Result;

static FENCED_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```[\w+.#-]*[ \t]*\r?\n(.*?)```").expect("fenced block pattern is valid")
});

/// Returns the body of the first fenced code block in `text`.
pub fn extract_code_block(text: &str) -> Option<&str> {
    FENCED_BLOCK
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".backup");
    PathBuf::from(name)
}

/// Writes `content` to `path`, copying any existing file to
/// `<path>.backup` first. Returns the backup location when one was made.
pub fn write_with_backup(path: &Path, content: &str) -> Result<Option<PathBuf>> {
    let backup = if path.is_file() {
        let backup = backup_path(path);
        fs::copy(path, &backup)?;
        info!("Backed up {} to {}", path.display(), backup.display());
        Some(backup)
    } else {
        None
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, content)?;
    Ok(backup)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    NoCodeBlock,
    Declined,
    Written { backup: Option<PathBuf> },
}

/// Extracts the first code block of `answer` and writes it to `target`
/// once `confirm` agrees. Nothing is touched unless a block exists and
/// the write was confirmed.
pub fn save_generated_code<F>(answer: &str, target: &Path, confirm: F) -> Result<WriteOutcome>
where
    F: FnOnce(&Path) -> Result<bool>,
{
    let Some(code) = extract_code_block(answer) else {
        return Ok(WriteOutcome::NoCodeBlock);
    };
    if !confirm(target)? {
        return Ok(WriteOutcome::Declined);
    }
    let backup = write_with_backup(target, code)?;
    Ok(WriteOutcome::Written { backup })
}
