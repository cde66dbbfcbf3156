//! Requirements manifest I/O: one entry per line, sorted.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("Failed to write manifest {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to read manifest {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Render entries sorted and deduplicated, one per line
pub fn render_manifest<I, S>(entries: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let sorted: BTreeSet<String> = entries
        .into_iter()
        .map(|entry| entry.as_ref().to_string())
        .collect();

    let mut output = String::new();
    for entry in sorted {
        output.push_str(&entry);
        output.push('\n');
    }
    output
}

/// Write the manifest to `path`, replacing any existing file
pub fn write_manifest<I, S>(entries: I, path: &Path) -> Result<(), ManifestError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    fs::write(path, render_manifest(entries)).map_err(|source| ManifestError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse manifest text, skipping blank lines and `#` comments
pub fn parse_manifest(content: &str) -> BTreeSet<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect()
}

pub fn read_manifest(path: &Path) -> Result<BTreeSet<String>, ManifestError> {
    let content = fs::read_to_string(path).map_err(|source| ManifestError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_manifest(&content))
}

/// Entries added and removed between two manifests
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

impl ManifestDiff {
    pub fn between(previous: &BTreeSet<String>, current: &BTreeSet<String>) -> Self {
        Self {
            added: current.difference(previous).cloned().collect(),
            removed: previous.difference(current).cloned().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}
