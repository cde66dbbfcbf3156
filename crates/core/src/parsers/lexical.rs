use crate::models::{top_level, ImportSet};
use regex::Regex;

use super::{ExtractStrategy, ImportExtractor, ParserError};

/// `import x` / `from x import ...` at the start of a line
const IMPORT_PATTERN: &str = r"(?m)^[ \t]*(?:import|from)[ \t]+([A-Za-z0-9_.]+)";

/// Regex-based extractor for sources the syntax tree cannot handle.
///
/// Purely lexical: a line inside a string literal that starts with `import`
/// is reported as an import, and only the first name of `import a, b` is seen.
#[derive(Debug)]
pub struct LexicalExtractor {
    pattern: Regex,
}

impl LexicalExtractor {
    pub fn new() -> Result<Self, ParserError> {
        let pattern =
            Regex::new(IMPORT_PATTERN).map_err(|e| ParserError::InitError(e.to_string()))?;
        Ok(Self { pattern })
    }
}

impl ImportExtractor for LexicalExtractor {
    fn extract(&mut self, source: &str) -> Result<ImportSet, ParserError> {
        let imports = self
            .pattern
            .captures_iter(source)
            .filter_map(|caps| caps.get(1))
            .map(|m| top_level(m.as_str()))
            .filter(|name| !name.is_empty())
            .map(String::from)
            .collect();
        Ok(imports)
    }

    fn strategy(&self) -> ExtractStrategy {
        ExtractStrategy::Lexical
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(source: &str) -> ImportSet {
        LexicalExtractor::new().unwrap().extract(source).unwrap()
    }

    #[test]
    fn test_line_anchored_imports() {
        let imports = extract("import os\n    from requests.models import Response\nx = 1\n");
        assert!(imports.contains("os"));
        assert!(imports.contains("requests"));
        assert_eq!(imports.len(), 2);
    }

    #[test]
    fn test_tolerates_invalid_syntax() {
        let imports = extract("import yaml\ndef broken(:\n%matplotlib inline\n");
        assert_eq!(imports.len(), 1);
        assert!(imports.contains("yaml"));
    }

    #[test]
    fn test_relative_imports_contribute_nothing() {
        assert!(extract("from . import utils\nfrom .models import User\n").is_empty());
    }

    #[test]
    fn test_mid_line_keywords_ignored() {
        assert!(extract("x = 'import os'\nprint('from here')\n").is_empty());
    }

    #[test]
    fn test_string_lines_are_matched() {
        let imports = extract("doc = \"\"\"\nimport fake\n\"\"\"\n");
        assert!(imports.contains("fake"));
    }
}
