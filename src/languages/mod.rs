pub mod plain;
pub mod python;
pub mod typescript;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Line-oriented heuristics for one family of file types.
///
/// Lines are passed already trimmed. The checks are prefix/substring tests,
/// not a grammar; minified or unusual formatting will be misclassified.
pub trait FileCategory: Send + Sync {
    fn name(&self) -> &'static str;
    fn file_extensions(&self) -> &[&'static str];

    fn is_import(&self, _line: &str) -> bool {
        false
    }

    fn is_declaration(&self, _line: &str) -> bool {
        false
    }
}

pub struct FileTypeRegistry {
    categories: HashMap<String, Arc<dyn FileCategory>>,
    extension_map: HashMap<String, String>,
}

impl FileTypeRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            categories: HashMap::new(),
            extension_map: HashMap::new(),
        };

        registry.register(Arc::new(python::PythonCategory));
        registry.register(Arc::new(typescript::EcmaScriptCategory));
        registry.register(Arc::new(plain::PlainCategory));

        registry
    }

    pub fn register(&mut self, category: Arc<dyn FileCategory>) {
        let name = category.name().to_string();
        for ext in category.file_extensions() {
            self.extension_map.insert(ext.to_string(), name.clone());
        }
        self.categories.insert(name, category);
    }

    pub fn get_by_name(&self, name: &str) -> Option<Arc<dyn FileCategory>> {
        self.categories.get(name).cloned()
    }

    /// Looks up a category by extension, with or without the leading dot.
    pub fn get_by_extension(&self, ext: &str) -> Option<Arc<dyn FileCategory>> {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        self.extension_map
            .get(&ext)
            .and_then(|name| self.categories.get(name))
            .cloned()
    }

    pub fn get_for_file(&self, path: &Path) -> Option<Arc<dyn FileCategory>> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| self.get_by_extension(ext))
    }

    pub fn supported_extensions(&self) -> Vec<&str> {
        let mut exts: Vec<&str> = self.extension_map.keys().map(|s| s.as_str()).collect();
        exts.sort_unstable();
        exts
    }
}

impl Default for FileTypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
