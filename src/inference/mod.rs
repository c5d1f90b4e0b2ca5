pub mod client;
pub mod stream;

pub use client::{Generation, InferenceClient};
pub use stream::{ChunkDecoder, GenerateChunk};

const ERROR_BODY_LIMIT: usize = 400;

/// Shortens a response body for inclusion in an error message.
pub(crate) fn truncate_for_error(value: &str) -> String {
    match value.char_indices().nth(ERROR_BODY_LIMIT) {
        Some((idx, _)) => format!("{}...", &value[..idx]),
        None => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_for_error() {
        assert_eq!(truncate_for_error("short"), "short");

        let long = "ж".repeat(500);
        let cut = truncate_for_error(&long);
        assert!(cut.ends_with("..."));
        assert_eq!(cut.chars().count(), ERROR_BODY_LIMIT + 3);
    }
}
