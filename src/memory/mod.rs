pub mod context;
pub mod history;

pub use context::{
    build_prompt, conversation_context, project_context, QuestionStyle, LISTING_KEYWORDS,
};
pub use history::{ConversationTurn, HistoryStore, TurnKind, HISTORY_WINDOW};
