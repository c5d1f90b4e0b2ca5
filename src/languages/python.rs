use super::FileCategory;

pub struct PythonCategory;

impl FileCategory for PythonCategory {
    fn name(&self) -> &'static str {
        "python"
    }

    fn file_extensions(&self) -> &[&'static str] {
        &["py"]
    }

    fn is_import(&self, line: &str) -> bool {
        line.starts_with("import ") || line.starts_with("from ")
    }

    fn is_declaration(&self, line: &str) -> bool {
        line.starts_with("def ") || line.starts_with("class ")
    }
}
