use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::storage::{self, ContextDir};

/// Number of turns read back into a prompt (three question/response exchanges).
pub const HISTORY_WINDOW: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnKind {
    Question,
    Response,
}

impl TurnKind {
    pub fn label(&self) -> &'static str {
        match self {
            TurnKind::Question => "QUESTION",
            TurnKind::Response => "RESPONSE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConversationTurn {
    #[serde(rename = "type")]
    pub kind: TurnKind,
    pub content: String,
    #[serde(deserialize_with = "crate::storage::deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn now(kind: TurnKind, content: impl Into<String>) -> Self {
        Self {
            kind,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Append-only conversation log backed by `conversation_history.json`.
///
/// The whole log is kept on disk; readers only ever see the last
/// [`HISTORY_WINDOW`] turns through [`HistoryStore::recent`].
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(context: &ContextDir) -> Self {
        Self {
            path: context.history_path(),
        }
    }

    pub fn load_all(&self) -> Result<Vec<ConversationTurn>> {
        Ok(storage::read_document::<Vec<ConversationTurn>>(&self.path)?.unwrap_or_default())
    }

    pub fn recent(&self) -> Result<Vec<ConversationTurn>> {
        let mut turns = self.load_all()?;
        let start = turns.len().saturating_sub(HISTORY_WINDOW);
        Ok(turns.split_off(start))
    }

    /// Appends one question turn and one response turn.
    pub fn append_exchange(&self, question: &str, response: &str) -> Result<()> {
        let mut turns = self.load_all()?;
        turns.push(ConversationTurn::now(TurnKind::Question, question));
        turns.push(ConversationTurn::now(TurnKind::Response, response));
        storage::write_document(&self.path, &turns)
    }

    pub fn clear(&self) -> Result<bool> {
        storage::remove_document(&self.path)
    }
}
