mod lexical;
mod python;

pub use lexical::LexicalExtractor;
pub use python::PythonParser;

use crate::models::ImportSet;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParserError {
    #[error("Failed to initialize parser: {0}")]
    InitError(String),
    #[error("Invalid syntax at line {line}, column {column}")]
    ParseError { line: usize, column: usize },
    #[error("Parser produced no syntax tree")]
    NoTree,
}

/// How import names are pulled out of source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractStrategy {
    /// Full syntax-tree walk; rejects invalid source
    #[default]
    Syntax,
    /// Line-anchored regex; never fails, can be fooled by strings and comments
    Lexical,
}

/// Trait for import extraction strategies
pub trait ImportExtractor {
    /// Return the top-level module names imported by `source`
    fn extract(&mut self, source: &str) -> Result<ImportSet, ParserError>;

    fn strategy(&self) -> ExtractStrategy;
}

/// Create an extractor for the given strategy
pub fn create_extractor(strategy: ExtractStrategy) -> Result<Box<dyn ImportExtractor>, ParserError> {
    match strategy {
        ExtractStrategy::Syntax => Ok(Box::new(PythonParser::new()?)),
        ExtractStrategy::Lexical => Ok(Box::new(LexicalExtractor::new()?)),
    }
}

/// One-shot extraction with a fresh extractor
pub fn extract_imports(source: &str, strategy: ExtractStrategy) -> Result<ImportSet, ParserError> {
    create_extractor(strategy)?.extract(source)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_imports_reports_syntax_errors() {
        assert!(extract_imports("import (", ExtractStrategy::Syntax).is_err());
        let imports = extract_imports("import (\nimport six", ExtractStrategy::Lexical).unwrap();
        assert!(imports.contains("six"));
    }

    #[test]
    fn test_strategies_agree_on_plain_imports() {
        let source = "import os\nimport numpy as np\nfrom requests.models import Response\n";
        for strategy in [ExtractStrategy::Syntax, ExtractStrategy::Lexical] {
            let mut extractor = create_extractor(strategy).unwrap();
            assert_eq!(extractor.strategy(), strategy);
            let imports = extractor.extract(source).unwrap();
            let expected: ImportSet = ["numpy", "os", "requests"]
                .into_iter()
                .map(String::from)
                .collect();
            assert_eq!(imports, expected);
        }
    }
}
