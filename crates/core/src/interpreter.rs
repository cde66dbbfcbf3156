//! Probing the host Python interpreter.
//!
//! The interpreter is asked for its version, its compiled-in module names and
//! its site-packages directories in a single JSON payload.

use serde::Deserialize;
use std::path::PathBuf;
use std::process::Command;
use thiserror::Error;

const PROBE_SCRIPT: &str = "\
import json, platform, site, sys
paths = []
try:
    paths.extend(site.getsitepackages())
except AttributeError:
    pass
try:
    paths.append(site.getusersitepackages())
except AttributeError:
    pass
paths.extend(p for p in sys.path if p.endswith(('site-packages', 'dist-packages')))
print(json.dumps({
    'version': platform.python_version(),
    'builtin_module_names': list(sys.builtin_module_names),
    'site_packages': paths,
}))
";

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Failed to run {python}: {source}")]
    Spawn {
        python: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{python} exited with {code} while probing: {stderr}")]
    Exit {
        python: String,
        code: i32,
        stderr: String,
    },
    #[error("Invalid probe payload: {0}")]
    Payload(#[from] serde_json::Error),
}

/// What the host interpreter reported about itself
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InterpreterInfo {
    pub version: String,
    pub builtin_module_names: Vec<String>,
    pub site_packages: Vec<PathBuf>,
}

impl InterpreterInfo {
    pub fn from_json(payload: &[u8]) -> Result<Self, ProbeError> {
        let mut info: InterpreterInfo = serde_json::from_slice(payload)?;
        let mut seen = std::collections::HashSet::new();
        info.site_packages
            .retain(|dir| dir.is_dir() && seen.insert(dir.clone()));
        Ok(info)
    }
}

/// Run `python` and collect its builtin modules and site-packages directories
pub fn probe(python: &str) -> Result<InterpreterInfo, ProbeError> {
    let output = Command::new(python)
        .arg("-c")
        .arg(PROBE_SCRIPT)
        .output()
        .map_err(|source| ProbeError::Spawn {
            python: python.to_string(),
            source,
        })?;

    if !output.status.success() {
        return Err(ProbeError::Exit {
            python: python.to_string(),
            code: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    let info = InterpreterInfo::from_json(&output.stdout)?;
    tracing::debug!(
        python,
        version = %info.version,
        site_packages = ?info.site_packages,
        "probed interpreter"
    );
    Ok(info)
}
