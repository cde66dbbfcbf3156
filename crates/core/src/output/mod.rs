mod json;
mod yaml;

pub use json::to_json;
pub use yaml::to_yaml;

use crate::models::ScanReport;
use serde::{Deserialize, Serialize};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Summary,
    Json,
    Yaml,
}

/// Format a ScanReport according to the specified format
pub fn format_report(report: &ScanReport, format: OutputFormat) -> Result<String, FormatError> {
    match format {
        OutputFormat::Json => to_json(report),
        OutputFormat::Yaml => to_yaml(report),
        OutputFormat::Summary => Ok(format_summary(report)),
    }
}

/// Generate a human-readable summary
pub fn format_summary(report: &ScanReport) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "Requirements Scan Summary\n\
         =========================\n\
         Root: {}\n\n",
        report.root.display()
    ));

    // Per-file listing of the imports seen so far
    output.push_str("All Imports:\n");
    for record in &report.files {
        output.push_str(&format!("\nFILE: {}\n", record.path.display()));
        for import in &record.cumulative {
            output.push_str(&format!("\t{}\n", import));
        }
    }
    output.push('\n');

    output.push_str(&format!(
        "Files Scanned: {}\n\
         - Python: {}\n\
         - Notebooks: {}\n\
         - Skipped: {}\n\n",
        report.stats.total_files,
        report.stats.source_files,
        report.stats.notebook_files,
        report.stats.skipped_files,
    ));

    output.push_str(&format!(
        "Distinct Imports: {}\n\
         - Local: {}\n\
         - Stdlib: {}\n\
         - Candidates: {}\n\n",
        report.stats.total_imports,
        report.stats.local_imports,
        report.stats.stdlib_imports,
        report.stats.candidate_imports,
    ));

    output.push_str("Final Imports:\n");
    for candidate in &report.candidates {
        output.push_str(&format!("\t{}\n", candidate));
    }
    output.push('\n');

    if let Some(ref resolved) = report.resolved {
        output.push_str("Pinned Packages:\n");
        for entry in resolved {
            output.push_str(&format!("\t{}\n", entry));
        }
        output.push('\n');
    }

    if !report.unresolved.is_empty() {
        output.push_str("Unresolved Imports:\n");
        for name in &report.unresolved {
            output.push_str(&format!("\t{}\n", name));
        }
        output.push('\n');
    }

    output.push_str(&format!(
        "Scan Duration: {}ms\n\
         Timestamp: {}\n\
         Tool Version: {}\n",
        report.metadata.scan_duration_ms, report.metadata.timestamp, report.metadata.tool_version
    ));

    output
}

#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("YAML serialization error: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::{FileRecord, ScanMetadata, ScanStats, SourceKind};
    use std::collections::BTreeSet;
    use std::path::PathBuf;

    fn set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    pub(crate) fn sample_report() -> ScanReport {
        ScanReport {
            root: PathBuf::from("/project"),
            files: vec![FileRecord {
                path: PathBuf::from("a.py"),
                name: "a.py".to_string(),
                kind: SourceKind::Source,
                imports: set(&["os", "requests"]),
                cumulative: set(&["os", "requests"]),
            }],
            local_modules: set(&["a"]),
            candidates: set(&["requests"]),
            resolved: None,
            unresolved: vec![],
            stats: ScanStats {
                total_files: 1,
                source_files: 1,
                total_imports: 2,
                stdlib_imports: 1,
                candidate_imports: 1,
                ..Default::default()
            },
            metadata: ScanMetadata::default(),
        }
    }

    #[test]
    fn test_summary_lists_files_and_final_imports() {
        let summary = format_summary(&sample_report());
        assert!(summary.contains("Root: /project"));
        assert!(summary.contains("FILE: a.py\n\tos\n\trequests\n"));
        assert!(summary.contains("Final Imports:\n\trequests\n"));
        assert!(!summary.contains("Pinned Packages"));
    }

    #[test]
    fn test_summary_shows_resolution() {
        let mut report = sample_report();
        report.resolved = Some(set(&["requests==2.31.0"]));
        report.unresolved = vec!["mystery".to_string()];

        let summary = format_summary(&report);
        assert!(summary.contains("Pinned Packages:\n\trequests==2.31.0\n"));
        assert!(summary.contains("Unresolved Imports:\n\tmystery\n"));
    }

    #[test]
    fn test_format_dispatch() {
        let report = sample_report();
        assert!(format_report(&report, OutputFormat::Json)
            .unwrap()
            .starts_with('{'));
        assert!(format_report(&report, OutputFormat::Summary)
            .unwrap()
            .starts_with("Requirements Scan Summary"));
    }
}
