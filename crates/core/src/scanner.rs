use crate::config::{FailurePolicy, IgnoreFilter, ScanConfig};
use crate::models::{FileRecord, ImportSet, SourceKind};
use crate::notebook::{extract_imports_from_notebook, NotebookError, NotebookOptions};
use crate::parsers::{create_extractor, ImportExtractor, ParserError};
use crate::source::read_source_text;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ParserError,
    },
    #[error("Failed to process notebook {path}: {source}")]
    Notebook {
        path: PathBuf,
        #[source]
        source: NotebookError,
    },
    #[error("Config error: {0}")]
    ConfigError(#[from] crate::config::ConfigError),
    #[error("Parser error: {0}")]
    ParserError(#[from] ParserError),
}

impl ScanError {
    /// Failures that `FailurePolicy::Skip` may isolate to a single file
    fn is_per_file(&self) -> bool {
        matches!(self, ScanError::Parse { .. } | ScanError::Notebook { .. })
    }
}

/// Accumulator threaded through the directory walk
#[derive(Debug, Clone, Default)]
pub struct ScanState {
    /// Union of every import seen so far
    pub cumulative: ImportSet,
    /// One record per processed file, in traversal order
    pub records: Vec<FileRecord>,
    /// Files dropped under `FailurePolicy::Skip`
    pub skipped: Vec<PathBuf>,
}

/// Walks a project and records the imports of every Python source and notebook
pub struct ImportScanner {
    config: ScanConfig,
    ignore_filter: IgnoreFilter,
}

impl ImportScanner {
    pub fn new(config: ScanConfig) -> Result<Self, ScanError> {
        let ignore_filter = IgnoreFilter::new(&config)?;
        Ok(Self {
            config,
            ignore_filter,
        })
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Scan the project and return one record per processed file
    pub fn scan(&self) -> Result<Vec<FileRecord>, ScanError> {
        Ok(self.scan_state()?.records)
    }

    /// Scan the project and return the full accumulator, skipped files included
    pub fn scan_state(&self) -> Result<ScanState, ScanError> {
        let mut extractor = create_extractor(self.config.strategy)?;

        self.find_source_files()
            .into_iter()
            .try_fold(ScanState::default(), |state, (path, kind)| {
                self.visit(state, &path, kind, extractor.as_mut())
            })
    }

    /// Find all `.py` and `.ipynb` files below the root
    fn find_source_files(&self) -> Vec<(PathBuf, SourceKind)> {
        let mut files = Vec::new();

        for entry in WalkDir::new(&self.config.root).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::debug!(error = %err, "skipping unreadable entry");
                    continue;
                }
            };
            let path = entry.path();

            // Symlinks count when they point at a regular file
            if !path.is_file() {
                continue;
            }

            let Some(kind) = SourceKind::from_path(path) else {
                continue;
            };

            if self.ignore_filter.should_ignore(path, false) {
                tracing::debug!(file = %path.display(), "ignored");
                continue;
            }

            files.push((path.to_path_buf(), kind));
        }

        files
    }

    /// Process one file and fold its imports into the running state
    fn visit(
        &self,
        mut state: ScanState,
        path: &Path,
        kind: SourceKind,
        extractor: &mut dyn ImportExtractor,
    ) -> Result<ScanState, ScanError> {
        let imports = match self.extract_file(path, kind, extractor) {
            Ok(imports) => imports,
            Err(err) if err.is_per_file() && self.config.failure_policy == FailurePolicy::Skip => {
                tracing::warn!(error = %err, "skipping file");
                state.skipped.push(path.to_path_buf());
                return Ok(state);
            }
            Err(err) => return Err(err),
        };

        let relative_path = path
            .strip_prefix(&self.config.root)
            .unwrap_or(path)
            .to_path_buf();
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        tracing::info!(
            file = %relative_path.display(),
            imports = ?imports,
            "processed"
        );

        state.cumulative.extend(imports.iter().cloned());
        state.records.push(FileRecord {
            path: relative_path,
            name,
            kind,
            imports,
            cumulative: state.cumulative.clone(),
        });

        Ok(state)
    }

    fn extract_file(
        &self,
        path: &Path,
        kind: SourceKind,
        extractor: &mut dyn ImportExtractor,
    ) -> Result<ImportSet, ScanError> {
        let text = read_source_text(path).map_err(|source| ScanError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        match kind {
            SourceKind::Source => extractor.extract(&text).map_err(|source| ScanError::Parse {
                path: path.to_path_buf(),
                source,
            }),
            SourceKind::Notebook => {
                let options = NotebookOptions {
                    strip_magics: self.config.strip_magics,
                    failure_policy: self.config.failure_policy,
                };
                extract_imports_from_notebook(&text, extractor, &options).map_err(|source| {
                    ScanError::Notebook {
                        path: path.to_path_buf(),
                        source,
                    }
                })
            }
        }
    }
}
