//! WASM bindings for MTA Rust ReqGen
//!
//! Exposes the text-level operations (import extraction from Python source
//! and from notebook documents) to JavaScript. Directory scanning and
//! package resolution need a filesystem and are not available here.

use mta_rust_reqgen_core::notebook::NotebookOptions;
use mta_rust_reqgen_core::{
    create_extractor, extract_imports_from_notebook, ExtractStrategy, ImportSet,
};
use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;

/// Result envelope returned to JavaScript
#[derive(Debug, Serialize, Deserialize)]
pub struct WasmResult {
    pub success: bool,
    pub data: Option<Vec<String>>,
    pub error: Option<String>,
}

impl WasmResult {
    fn from_result<E: std::fmt::Display>(result: Result<ImportSet, E>) -> Self {
        match result {
            Ok(imports) => WasmResult {
                success: true,
                data: Some(imports.into_iter().collect()),
                error: None,
            },
            Err(e) => WasmResult {
                success: false,
                data: None,
                error: Some(e.to_string()),
            },
        }
    }

    fn to_js(&self) -> JsValue {
        serde_wasm_bindgen::to_value(self).unwrap_or(JsValue::NULL)
    }
}

fn strategy(lexical: bool) -> ExtractStrategy {
    if lexical {
        ExtractStrategy::Lexical
    } else {
        ExtractStrategy::Syntax
    }
}

/// Sorted top-level modules imported by `source`
pub fn source_imports(source: &str, lexical: bool) -> WasmResult {
    WasmResult::from_result(mta_rust_reqgen_core::extract_imports(source, strategy(lexical)))
}

/// Sorted top-level modules imported by the code cells of a notebook document
pub fn notebook_imports(document: &str, lexical: bool) -> WasmResult {
    let result = create_extractor(strategy(lexical))
        .map_err(|e| e.to_string())
        .and_then(|mut extractor| {
            extract_imports_from_notebook(document, extractor.as_mut(), &NotebookOptions::default())
                .map_err(|e| e.to_string())
        });
    WasmResult::from_result(result)
}

/// Parse Python source and return `{success, data, error}`
#[wasm_bindgen]
pub fn extract_imports(source: &str, lexical: bool) -> JsValue {
    source_imports(source, lexical).to_js()
}

/// Parse a notebook (.ipynb JSON) and return `{success, data, error}`
#[wasm_bindgen]
pub fn extract_notebook_imports(document: &str, lexical: bool) -> JsValue {
    notebook_imports(document, lexical).to_js()
}

/// Get the library version
#[wasm_bindgen]
pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_imports() {
        let result = source_imports("import numpy as np\nfrom a.b import c\n", false);
        assert!(result.success);
        assert_eq!(result.data, Some(vec!["a".to_string(), "numpy".to_string()]));
    }

    #[test]
    fn test_source_syntax_error() {
        let result = source_imports("def broken(:\n", false);
        assert!(!result.success);
        assert!(result.error.is_some());
    }

    #[test]
    fn test_notebook_imports() {
        let document = r#"{"cells": [{"cell_type": "code", "source": ["import torch\n"]}]}"#;
        let result = notebook_imports(document, false);
        assert_eq!(result.data, Some(vec!["torch".to_string()]));

        let malformed = notebook_imports("[]", true);
        assert!(!malformed.success);
    }
}
