//! Prompt context assembled from the file index and recent conversation.
//!
//! Both blocks are bounded: listing questions get only the path list, detail
//! questions get at most [`DETAIL_FILE_LIMIT`] files, and each past turn is
//! cut to [`TURN_PREVIEW_CHARS`] characters.

use crate::index::FileIndex;
use crate::memory::history::ConversationTurn;

/// Any of these (as a substring of the lowercased question) selects the
/// listing-style context.
pub const LISTING_KEYWORDS: &[&str] = &["files", "what", "list", "show"];

pub const DETAIL_FILE_LIMIT: usize = 3;
pub const DETAIL_DECLARATION_LIMIT: usize = 2;
pub const TURN_PREVIEW_CHARS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionStyle {
    Listing,
    Detail,
}

impl QuestionStyle {
    pub fn classify(question: &str) -> Self {
        let lowered = question.to_lowercase();
        if LISTING_KEYWORDS.iter().any(|kw| lowered.contains(kw)) {
            QuestionStyle::Listing
        } else {
            QuestionStyle::Detail
        }
    }
}

pub fn project_context(question: &str, index: &FileIndex) -> String {
    match QuestionStyle::classify(question) {
        QuestionStyle::Listing => listing_context(index),
        QuestionStyle::Detail => detail_context(index),
    }
}

fn listing_context(index: &FileIndex) -> String {
    let paths: Vec<&str> = index.keys().map(|k| k.as_str()).collect();
    format!("=== PROJECT SUMMARY ===\nFiles: {}\n", paths.join(", "))
}

fn detail_context(index: &FileIndex) -> String {
    let mut out = String::from("=== PROJECT CONTEXT ===\n");
    out.push_str(&format!("Files in project: {}\n\n", index.len()));

    for (path, record) in index.iter().take(DETAIL_FILE_LIMIT) {
        out.push_str(&format!("File: {} ({} lines)\n", path, record.lines));
        if !record.functions.is_empty() {
            let shown: Vec<&str> = record
                .functions
                .iter()
                .take(DETAIL_DECLARATION_LIMIT)
                .map(|s| s.as_str())
                .collect();
            out.push_str(&format!("  Functions: {}\n", shown.join(", ")));
        }
    }

    if index.len() > DETAIL_FILE_LIMIT {
        out.push_str(&format!(
            "... and {} more files\n",
            index.len() - DETAIL_FILE_LIMIT
        ));
    }
    out
}

/// Renders past turns; empty when there is no history.
pub fn conversation_context(turns: &[ConversationTurn]) -> String {
    if turns.is_empty() {
        return String::new();
    }

    let mut out = String::from("\n=== RECENT CONVERSATION ===\n");
    for turn in turns {
        let preview: String = turn.content.chars().take(TURN_PREVIEW_CHARS).collect();
        out.push_str(&format!("{}: {}...\n", turn.kind.label(), preview));
    }
    out
}

pub fn build_prompt(project: &str, conversation: &str, question: &str) -> String {
    format!(
        "You are a coding assistant with full knowledge of this project.\n\n\
         {project}{conversation}\n\n\
         Question: {question}\n\n\
         Please provide a helpful response based on the project context above. \
         For code requests, show complete, working code."
    )
}
