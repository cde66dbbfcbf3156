//! End-to-end run: scan, classify, optionally pin, report.

use crate::categorizer::{classify, stdlib_registry, StdlibPolicy};
use crate::config::ScanConfig;
use crate::interpreter::{probe, InterpreterInfo};
use crate::manifest::{write_manifest, ManifestError};
use crate::models::{FileRecord, ScanMetadata, ScanReport, ScanStats, SourceKind};
use crate::resolver::{resolve, PackageResolver, SitePackagesIndex};
use crate::scanner::{ImportScanner, ScanError};
use std::time::Instant;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Manifest(#[from] ManifestError),
}

/// Host facts the pipeline needs but does not compute itself
#[derive(Default)]
pub struct Environment<'a> {
    /// Builtin module names reported by the interpreter
    pub builtins: Option<Vec<String>>,
    /// Distribution lookup; resolution is skipped when absent
    pub resolver: Option<&'a dyn PackageResolver>,
}

/// Scan and classify using the live host environment where the config asks for it
pub fn generate(config: &ScanConfig) -> Result<ScanReport, PipelineError> {
    let needs_probe = config.stdlib_policy == StdlibPolicy::Builtin
        || (config.resolve && config.site_packages.is_empty());
    let info = if needs_probe {
        probe_host(&config.python)
    } else {
        None
    };

    let index = if config.resolve {
        let dirs = if config.site_packages.is_empty() {
            info.as_ref()
                .map(|info| info.site_packages.clone())
                .unwrap_or_default()
        } else {
            config.site_packages.clone()
        };
        if dirs.is_empty() {
            tracing::warn!("no site-packages directories found; every candidate will be unresolved");
        }
        Some(SitePackagesIndex::scan(&dirs))
    } else {
        None
    };

    let builtins = match config.stdlib_policy {
        StdlibPolicy::Builtin => info.map(|info| info.builtin_module_names),
        StdlibPolicy::Full => None,
    };

    let env = Environment {
        builtins,
        resolver: index.as_ref().map(|index| index as &dyn PackageResolver),
    };
    generate_with(config, env)
}

fn probe_host(python: &str) -> Option<InterpreterInfo> {
    match probe(python) {
        Ok(info) => Some(info),
        Err(err) => {
            tracing::warn!(error = %err, "could not probe the Python interpreter");
            None
        }
    }
}

/// Scan and classify against an explicit environment
pub fn generate_with(config: &ScanConfig, env: Environment) -> Result<ScanReport, PipelineError> {
    let start = Instant::now();

    let scanner = ImportScanner::new(config.clone())?;
    let state = scanner.scan_state()?;

    let registry = stdlib_registry(config.stdlib_policy, env.builtins);
    let classification = classify(&state.records, registry.as_ref());

    let (resolved, unresolved) = match env.resolver {
        Some(resolver) => {
            let resolution = resolve(&classification.candidates, registry.as_ref(), resolver);
            (Some(resolution.pinned), resolution.unresolved)
        }
        None => (None, vec![]),
    };

    let stats = ScanStats {
        total_files: state.records.len(),
        source_files: count_kind(&state.records, SourceKind::Source),
        notebook_files: count_kind(&state.records, SourceKind::Notebook),
        skipped_files: state.skipped.len(),
        total_imports: state.cumulative.len(),
        local_imports: classification.local.len(),
        stdlib_imports: classification.stdlib.len(),
        candidate_imports: classification.candidates.len(),
        resolved_packages: resolved.as_ref().map_or(0, |pinned| pinned.len()),
        unresolved_packages: unresolved.len(),
    };

    let metadata = ScanMetadata {
        scan_duration_ms: start.elapsed().as_millis() as u64,
        ..Default::default()
    };

    tracing::info!(candidates = ?classification.candidates, "final imports");

    Ok(ScanReport {
        root: config.root.clone(),
        files: state.records,
        local_modules: classification.local_modules,
        candidates: classification.candidates,
        resolved,
        unresolved,
        stats,
        metadata,
    })
}

fn count_kind(records: &[FileRecord], kind: SourceKind) -> usize {
    records.iter().filter(|record| record.kind == kind).count()
}

/// Write the report's manifest entries to the configured output path
pub fn write_report_manifest(report: &ScanReport, config: &ScanConfig) -> Result<(), PipelineError> {
    write_manifest(report.manifest_entries(), &config.output)?;
    tracing::info!(
        path = %config.output.display(),
        entries = report.manifest_entries().len(),
        "wrote manifest"
    );
    Ok(())
}
