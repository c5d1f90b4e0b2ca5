use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssistantError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A persisted document exists but does not match its schema.
    #[error("Corrupt store {}: {reason}", path.display())]
    CorruptStore { path: PathBuf, reason: String },

    #[error("Config error: {0}")]
    Config(String),

    #[error("Watcher error: {0}")]
    Watcher(String),

    #[error("Inference error: {0}")]
    Inference(String),

    #[error("Prompt error: {0}")]
    Prompt(String),

    #[error("Path is outside the project root: {}", .0.display())]
    OutsideRoot(PathBuf),
}

pub type Result<T> = std::result::Result<T, AssistantError>;
