use super::FileCategory;

/// Markup, data and text files. Indexed for size and preview only.
pub struct PlainCategory;

impl FileCategory for PlainCategory {
    fn name(&self) -> &'static str {
        "plain"
    }

    fn file_extensions(&self) -> &[&'static str] {
        &[
            "html",
            "css",
            "json",
            "md",
            "sql",
            "yaml",
            "yml",
            "dockerfile",
            "txt",
        ]
    }
}
