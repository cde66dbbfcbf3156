//! MTA Rust ReqGen Core Library
//!
//! This library scans a Python project, extracts the modules each source file
//! and notebook imports, and turns them into a requirements manifest.
//!
//! # Features
//!
//! - Parse Python imports (import, from...import) with tree-sitter, or with a
//!   line-anchored regex for code that does not parse
//! - Read Jupyter notebooks and extract imports from their code cells
//! - Exclude local project modules and standard library modules
//! - Optionally pin the remaining imports to installed distributions
//! - Write a sorted `my_requirements.txt` and report in summary, JSON or YAML
//!
//! # Example
//!
//! ```no_run
//! use mta_rust_reqgen_core::{generate, write_report_manifest, format_report, OutputFormat, ScanConfig};
//! use std::path::PathBuf;
//!
//! let config = ScanConfig::new(PathBuf::from("."));
//! let report = generate(&config).unwrap();
//!
//! println!("{}", format_report(&report, OutputFormat::Summary).unwrap());
//! write_report_manifest(&report, &config).unwrap();
//! ```

pub mod categorizer;
pub mod config;
pub mod interpreter;
pub mod manifest;
pub mod models;
pub mod notebook;
pub mod output;
pub mod parsers;
pub mod pipeline;
pub mod resolver;
pub mod scanner;
pub mod source;

// Re-exports for convenience
pub use categorizer::{classify, filter_candidates, StdlibPolicy, StdlibRegistry};
pub use config::{FailurePolicy, FileConfig, ScanConfig, DEFAULT_OUTPUT};
pub use manifest::{read_manifest, write_manifest, ManifestDiff};
pub use models::*;
pub use notebook::extract_imports_from_notebook;
pub use output::{format_report, format_summary, OutputFormat};
pub use parsers::{create_extractor, extract_imports, ExtractStrategy, ImportExtractor};
pub use pipeline::{generate, generate_with, write_report_manifest, Environment, PipelineError};
pub use resolver::{resolve, Distribution, PackageResolver, SitePackagesIndex};
pub use scanner::{ImportScanner, ScanError};
