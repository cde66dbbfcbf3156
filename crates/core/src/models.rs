use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Set of top-level module names
pub type ImportSet = BTreeSet<String>;

/// Reduce a dotted module path to its top-level component (`pkg.sub.mod` -> `pkg`)
pub fn top_level(module: &str) -> &str {
    module.split('.').next().unwrap_or(module).trim()
}

/// Kind of scanned file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Plain Python source (`.py`)
    Source,
    /// Jupyter notebook (`.ipynb`)
    Notebook,
}

impl SourceKind {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "py" => Some(SourceKind::Source),
            "ipynb" => Some(SourceKind::Notebook),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }
}

/// One processed file and the imports seen up to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Path relative to the scan root
    pub path: PathBuf,
    /// File name, as used for local module detection
    pub name: String,
    pub kind: SourceKind,
    /// Imports found in this file alone
    pub imports: ImportSet,
    /// Union of all imports seen so far, this file included
    pub cumulative: ImportSet,
}

impl FileRecord {
    /// Module name this file provides to the project (`utils.py` -> `utils`)
    pub fn local_module(&self) -> &str {
        top_level(&self.name)
    }
}

/// Statistics about a scan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStats {
    pub total_files: usize,
    pub source_files: usize,
    pub notebook_files: usize,
    pub skipped_files: usize,
    pub total_imports: usize,
    pub local_imports: usize,
    pub stdlib_imports: usize,
    pub candidate_imports: usize,
    pub resolved_packages: usize,
    pub unresolved_packages: usize,
}

/// Scan metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanMetadata {
    pub scan_duration_ms: u64,
    pub timestamp: String,
    pub tool_version: String,
}

impl Default for ScanMetadata {
    fn default() -> Self {
        Self {
            scan_duration_ms: 0,
            timestamp: chrono::Utc::now().to_rfc3339(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Everything a run produced, from per-file records to the manifest entries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    /// Project root path
    pub root: PathBuf,
    /// Processed files in traversal order
    pub files: Vec<FileRecord>,
    /// Module names provided by the project itself
    pub local_modules: BTreeSet<String>,
    /// Imports surviving local and standard-library exclusion
    pub candidates: BTreeSet<String>,
    /// Pinned `name==version` entries, when resolution ran
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved: Option<BTreeSet<String>>,
    /// Candidates with no installed distribution
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unresolved: Vec<String>,
    pub stats: ScanStats,
    pub metadata: ScanMetadata,
}

impl ScanReport {
    /// Entries destined for the manifest: pinned strings if resolution ran, bare names otherwise
    pub fn manifest_entries(&self) -> &BTreeSet<String> {
        self.resolved.as_ref().unwrap_or(&self.candidates)
    }

    /// Union of every file's imports
    pub fn all_imports(&self) -> ImportSet {
        self.files
            .last()
            .map(|record| record.cumulative.clone())
            .unwrap_or_default()
    }
}
