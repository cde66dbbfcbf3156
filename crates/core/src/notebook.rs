//! Jupyter notebook support.
//!
//! A notebook is a JSON document with a top-level `cells` array. Each code
//! cell's `source` (a string or a list of line fragments) is joined and run
//! through an [`ImportExtractor`]; per-cell results are unioned.

use crate::config::FailurePolicy;
use crate::models::ImportSet;
use crate::parsers::{ImportExtractor, ParserError};
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NotebookError {
    #[error("Malformed notebook: {0}")]
    Malformed(String),
    #[error("Code cell {index}: {source}")]
    Cell {
        index: usize,
        #[source]
        source: ParserError,
    },
}

impl From<serde_json::Error> for NotebookError {
    fn from(err: serde_json::Error) -> Self {
        NotebookError::Malformed(err.to_string())
    }
}

/// Cell source, stored either whole or as line fragments
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CellSource {
    Text(String),
    Lines(Vec<String>),
}

impl Default for CellSource {
    fn default() -> Self {
        CellSource::Text(String::new())
    }
}

impl CellSource {
    /// Join fragments with no separator; fragments carry their own newlines
    pub fn joined(&self) -> String {
        match self {
            CellSource::Text(text) => text.clone(),
            CellSource::Lines(lines) => lines.concat(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Cell {
    #[serde(default)]
    pub cell_type: String,
    #[serde(default)]
    pub source: CellSource,
}

impl Cell {
    pub fn is_code(&self) -> bool {
        self.cell_type == "code"
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Notebook {
    #[serde(default)]
    pub cells: Vec<Cell>,
}

impl Notebook {
    pub fn parse(document: &str) -> Result<Self, NotebookError> {
        let value: serde_json::Value = serde_json::from_str(document)?;
        if !value.is_object() {
            return Err(NotebookError::Malformed(
                "top-level value is not an object".to_string(),
            ));
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Code cells with their position among all cells
    pub fn code_cells(&self) -> impl Iterator<Item = (usize, &Cell)> {
        self.cells.iter().enumerate().filter(|(_, cell)| cell.is_code())
    }
}

/// How code cells are prepared and how their failures are handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotebookOptions {
    pub strip_magics: bool,
    pub failure_policy: FailurePolicy,
}

impl Default for NotebookOptions {
    fn default() -> Self {
        Self {
            strip_magics: true,
            failure_policy: FailurePolicy::Abort,
        }
    }
}

/// `%name` / `%%name` magics and `!cmd` shell escapes; never `!=`, `%=` or `% x`
fn is_magic(line: &str) -> bool {
    let trimmed = line.trim_start();
    if let Some(rest) = trimmed.strip_prefix('!') {
        return !rest.starts_with('=');
    }
    match trimmed.strip_prefix('%') {
        Some(rest) => rest
            .trim_start_matches('%')
            .starts_with(|c: char| c.is_ascii_alphabetic() || c == '_'),
        None => false,
    }
}

/// Lexical state carried from one physical line to the next
#[derive(Debug, Default)]
struct LineState {
    brackets: usize,
    triple_quote: Option<&'static [u8]>,
    backslash: bool,
}

impl LineState {
    /// True while earlier lines left a statement open
    fn continues(&self) -> bool {
        self.brackets > 0 || self.triple_quote.is_some() || self.backslash
    }

    fn advance(&mut self, line: &str) {
        let bytes = line.as_bytes();
        let mut comment = false;
        let mut i = 0;

        while i < bytes.len() {
            if let Some(quote) = self.triple_quote {
                if bytes[i..].starts_with(quote) {
                    self.triple_quote = None;
                    i += quote.len();
                } else {
                    i += if bytes[i] == b'\\' { 2 } else { 1 };
                }
                continue;
            }

            match bytes[i] {
                b'#' => {
                    comment = true;
                    break;
                }
                b'(' | b'[' | b'{' => self.brackets += 1,
                b')' | b']' | b'}' => self.brackets = self.brackets.saturating_sub(1),
                quote @ (b'"' | b'\'') => {
                    let triple: &'static [u8] = if quote == b'"' { b"\"\"\"" } else { b"'''" };
                    if bytes[i..].starts_with(triple) {
                        self.triple_quote = Some(triple);
                        i += triple.len();
                        continue;
                    }
                    i += 1;
                    while i < bytes.len() && bytes[i] != quote {
                        if bytes[i] == b'\\' {
                            i += 1;
                        }
                        i += 1;
                    }
                }
                _ => {}
            }
            i += 1;
        }

        self.backslash = !comment
            && self.triple_quote.is_none()
            && line.trim_end_matches(['\r', '\n']).ends_with('\\');
    }
}

/// Blank out IPython line magics and shell escapes, keeping line numbers.
/// Only lines that start a statement are candidates, so operators on
/// continuation lines (`!= 2)`, `% 3)`) are left alone.
/// Returns `None` for a cell driven by a `%%` cell magic.
pub fn strip_magics(code: &str) -> Option<String> {
    let first = code.lines().map(str::trim_start).find(|line| !line.is_empty());
    if first.is_some_and(|line| line.starts_with("%%") && is_magic(line)) {
        return None;
    }

    let mut state = LineState::default();
    let mut stripped = String::with_capacity(code.len());
    for line in code.split_inclusive('\n') {
        if !state.continues() && is_magic(line) {
            if line.ends_with('\n') {
                stripped.push('\n');
            }
            continue;
        }
        state.advance(line);
        stripped.push_str(line);
    }
    Some(stripped)
}

/// Extract the imports of every code cell in `document`
pub fn extract_imports_from_notebook(
    document: &str,
    extractor: &mut dyn ImportExtractor,
    options: &NotebookOptions,
) -> Result<ImportSet, NotebookError> {
    let notebook = Notebook::parse(document)?;
    let mut imports = ImportSet::new();

    for (index, cell) in notebook.code_cells() {
        let code = cell.source.joined();
        let code = if options.strip_magics {
            match strip_magics(&code) {
                Some(code) => code,
                None => {
                    tracing::debug!(cell = index, "skipping cell magic");
                    continue;
                }
            }
        } else {
            code
        };

        match extractor.extract(&code) {
            Ok(cell_imports) => imports.extend(cell_imports),
            Err(source) => match options.failure_policy {
                FailurePolicy::Abort => return Err(NotebookError::Cell { index, source }),
                FailurePolicy::Skip => {
                    tracing::warn!(cell = index, error = %source, "skipping unparsable cell");
                }
            },
        }
    }

    Ok(imports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::{LexicalExtractor, PythonParser};

    const NOTEBOOK: &str = r##"{
        "cells": [
            {"cell_type": "markdown", "source": ["# Title\n", "import hidden\n"]},
            {"cell_type": "code", "source": ["import numpy as np\n", "from pandas.io import sql\n"]},
            {"cell_type": "raw", "source": "import alsohidden"},
            {"cell_type": "code", "source": "import requests"}
        ],
        "metadata": {},
        "nbformat": 4,
        "nbformat_minor": 5
    }"##;

    fn set(names: &[&str]) -> ImportSet {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn extract(document: &str, options: &NotebookOptions) -> Result<ImportSet, NotebookError> {
        let mut parser = PythonParser::new().unwrap();
        extract_imports_from_notebook(document, &mut parser, options)
    }

    #[test]
    fn test_only_code_cells_contribute() {
        let imports = extract(NOTEBOOK, &NotebookOptions::default()).unwrap();
        assert_eq!(imports, set(&["numpy", "pandas", "requests"]));
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let options = NotebookOptions::default();
        let first = extract(NOTEBOOK, &options).unwrap();
        let second = extract(NOTEBOOK, &options).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_fragments_join_without_separator() {
        let document = r#"{"cells": [{"cell_type": "code", "source": ["import js", "on\n"]}]}"#;
        let imports = extract(document, &NotebookOptions::default()).unwrap();
        assert_eq!(imports, set(&["json"]));
    }

    #[test]
    fn test_missing_cells_is_empty() {
        let imports = extract(r#"{"metadata": {}}"#, &NotebookOptions::default()).unwrap();
        assert!(imports.is_empty());
    }

    #[test]
    fn test_malformed_documents() {
        let options = NotebookOptions::default();
        assert!(matches!(
            extract("not json", &options),
            Err(NotebookError::Malformed(_))
        ));
        assert!(matches!(
            extract("[1, 2, 3]", &options),
            Err(NotebookError::Malformed(_))
        ));
        assert!(matches!(
            extract(r#"{"cells": 5}"#, &options),
            Err(NotebookError::Malformed(_))
        ));
    }

    #[test]
    fn test_magics_are_stripped() {
        let document = r#"{"cells": [
            {"cell_type": "code", "source": ["%matplotlib inline\n", "!pip install seaborn\n", "import seaborn\n"]},
            {"cell_type": "code", "source": ["%%bash\n", "echo hi\n"]}
        ]}"#;
        let imports = extract(document, &NotebookOptions::default()).unwrap();
        assert_eq!(imports, set(&["seaborn"]));
    }

    #[test]
    fn test_bad_cell_aborts_by_default() {
        let document = r#"{"cells": [
            {"cell_type": "code", "source": "import os"},
            {"cell_type": "code", "source": "def broken(:\n"}
        ]}"#;
        let err = extract(document, &NotebookOptions::default()).unwrap_err();
        assert!(matches!(err, NotebookError::Cell { index: 1, .. }));
    }

    #[test]
    fn test_bad_cell_skipped_under_skip_policy() {
        let document = r#"{"cells": [
            {"cell_type": "code", "source": "def broken(:\n"},
            {"cell_type": "code", "source": "import os"}
        ]}"#;
        let options = NotebookOptions {
            strip_magics: true,
            failure_policy: FailurePolicy::Skip,
        };
        assert_eq!(extract(document, &options).unwrap(), set(&["os"]));
    }

    #[test]
    fn test_magics_fail_without_stripping() {
        let document = r#"{"cells": [{"cell_type": "code", "source": "%time import os\n"}]}"#;
        let options = NotebookOptions {
            strip_magics: false,
            failure_policy: FailurePolicy::Abort,
        };
        assert!(extract(document, &options).is_err());
    }

    #[test]
    fn test_works_with_lexical_strategy() {
        let mut extractor = LexicalExtractor::new().unwrap();
        let imports =
            extract_imports_from_notebook(NOTEBOOK, &mut extractor, &NotebookOptions::default())
                .unwrap();
        assert_eq!(imports, set(&["numpy", "pandas", "requests"]));
    }

    #[test]
    fn test_operators_on_continuation_lines_are_kept() {
        let document = r#"{"cells": [{"cell_type": "code", "source": [
            "import numpy\n",
            "ok = (1\n",
            "      != 2)\n",
            "r = (10\n",
            "     % 3)\n",
            "total = 1 + \\\n",
            "    2\n"
        ]}]}"#;
        let imports = extract(document, &NotebookOptions::default()).unwrap();
        assert_eq!(imports, set(&["numpy"]));
    }

    #[test]
    fn test_magic_shapes() {
        assert!(is_magic("%matplotlib inline"));
        assert!(is_magic("  %%timeit"));
        assert!(is_magic("!ls -la"));
        assert!(!is_magic("!= 2)"));
        assert!(!is_magic("% 3)"));
        assert!(!is_magic("%= 4"));
        assert!(!is_magic("import os"));
    }

    #[test]
    fn test_strings_and_comments_do_not_open_brackets() {
        let code = "s = \"(\"  # (\n%who\ndoc = \"\"\"\n%inside_docstring\n\"\"\"\n";
        let stripped = strip_magics(code).unwrap();
        assert_eq!(stripped, "s = \"(\"  # (\n\ndoc = \"\"\"\n%inside_docstring\n\"\"\"\n");
    }

    #[test]
    fn test_strip_magics_keeps_line_count() {
        let stripped = strip_magics("import os\n%load_ext autoreload\nimport sys").unwrap();
        assert_eq!(stripped, "import os\n\nimport sys");
    }
}
