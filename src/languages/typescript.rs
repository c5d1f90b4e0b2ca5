use super::FileCategory;

/// JavaScript and TypeScript, including their JSX variants.
pub struct EcmaScriptCategory;

impl FileCategory for EcmaScriptCategory {
    fn name(&self) -> &'static str {
        "ecmascript"
    }

    fn file_extensions(&self) -> &[&'static str] {
        &["js", "jsx", "ts", "tsx"]
    }

    fn is_import(&self, line: &str) -> bool {
        line.starts_with("import ") || (line.starts_with("const ") && line.contains("require("))
    }

    fn is_declaration(&self, line: &str) -> bool {
        line.contains("function ") || (line.starts_with("const ") && line.contains("=>"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_es_imports() {
        let category = EcmaScriptCategory;
        assert!(category.is_import("import React from 'react';"));
        assert!(category.is_import("const fs = require('fs');"));
        assert!(!category.is_import("const x = 1;"));
        assert!(!category.is_import("let fs = require('fs');"));
    }

    #[test]
    fn test_es_declarations() {
        let category = EcmaScriptCategory;
        assert!(category.is_declaration("function add(a, b) {"));
        assert!(category.is_declaration("export default function App() {"));
        assert!(category.is_declaration("const handler = (req) => {"));
        assert!(!category.is_declaration("let f = () => 1;"));
        assert!(!category.is_declaration("const total = 3;"));
    }
}
