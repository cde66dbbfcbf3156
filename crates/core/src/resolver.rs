use crate::categorizer::StdlibRegistry;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

/// An installed distribution
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Distribution {
    pub name: String,
    pub version: String,
}

impl Distribution {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    /// `name==version` requirement line
    pub fn pin(&self) -> String {
        format!("{}=={}", self.name, self.version)
    }
}

/// Maps an import name to the distribution that provides it
pub trait PackageResolver {
    fn lookup(&self, import_name: &str) -> Option<Distribution>;
}

impl PackageResolver for HashMap<String, Distribution> {
    fn lookup(&self, import_name: &str) -> Option<Distribution> {
        self.get(import_name).cloned()
    }
}

/// Result of pinning candidate imports
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub pinned: BTreeSet<String>,
    pub unresolved: Vec<String>,
}

/// Pin every non-stdlib candidate; misses are logged and dropped
pub fn resolve<'a, I>(
    candidates: I,
    registry: &dyn StdlibRegistry,
    resolver: &dyn PackageResolver,
) -> Resolution
where
    I: IntoIterator<Item = &'a String>,
{
    let mut resolution = Resolution::default();

    for name in candidates {
        if registry.is_stdlib(name) {
            continue;
        }
        match resolver.lookup(name) {
            Some(dist) => {
                resolution.pinned.insert(dist.pin());
            }
            None => {
                tracing::warn!("Package for import '{}' not found.", name);
                resolution.unresolved.push(name.clone());
            }
        }
    }

    resolution
}

/// Normalize a distribution name for comparison (PEP 503, plus `.`)
pub fn normalize_name(name: &str) -> String {
    name.trim()
        .to_ascii_lowercase()
        .replace(['_', '.'], "-")
}

/// Index of the distributions installed in one or more site-packages directories
#[derive(Debug, Clone, Default)]
pub struct SitePackagesIndex {
    /// Normalized distribution name -> distribution
    by_name: HashMap<String, Distribution>,
    /// Top-level import name -> distribution
    by_top_level: HashMap<String, Distribution>,
}

impl SitePackagesIndex {
    /// Scan `*.dist-info` and `*.egg-info` entries of each directory.
    /// Earlier directories win when a distribution is installed twice.
    pub fn scan(dirs: &[PathBuf]) -> Self {
        let mut index = Self::default();
        for dir in dirs {
            let Ok(entries) = fs::read_dir(dir) else {
                tracing::debug!(dir = %dir.display(), "site-packages directory not readable");
                continue;
            };
            let mut infos: Vec<PathBuf> = entries
                .flatten()
                .map(|entry| entry.path())
                .filter(|path| metadata_kind(path).is_some())
                .collect();
            infos.sort();
            for info in infos {
                index.add_metadata_dir(&info);
            }
        }
        tracing::debug!(distributions = index.len(), "indexed site-packages");
        index
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    pub fn insert(&mut self, dist: Distribution, top_level: &[String]) {
        for module in top_level {
            self.by_top_level
                .entry(module.clone())
                .or_insert_with(|| dist.clone());
        }
        self.by_name.entry(normalize_name(&dist.name)).or_insert(dist);
    }

    fn add_metadata_dir(&mut self, path: &Path) {
        let Some(kind) = metadata_kind(path) else {
            return;
        };
        let headers = if path.is_dir() {
            fs::read_to_string(path.join(kind.metadata_file())).ok()
        } else {
            // Legacy single-file egg-info
            fs::read_to_string(path).ok()
        };

        let (name, version) = headers
            .as_deref()
            .map(read_name_version)
            .unwrap_or((None, None));
        let (fallback_name, fallback_version) = split_dir_name(path, kind);

        let Some(name) = name.or(fallback_name) else {
            return;
        };
        let Some(version) = version.or(fallback_version) else {
            tracing::debug!(dist = %name, "distribution without version");
            return;
        };

        let top_level = fs::read_to_string(path.join("top_level.txt"))
            .map(|contents| {
                contents
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .map(|line| line.replace('/', "."))
                    .map(|line| crate::models::top_level(&line).to_string())
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        self.insert(Distribution::new(name, version), &top_level);
    }
}

impl PackageResolver for SitePackagesIndex {
    /// Distribution named like the import first, then any distribution
    /// listing the import in its `top_level.txt`
    fn lookup(&self, import_name: &str) -> Option<Distribution> {
        self.by_name
            .get(&normalize_name(import_name))
            .or_else(|| self.by_top_level.get(import_name))
            .cloned()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MetadataKind {
    DistInfo,
    EggInfo,
}

impl MetadataKind {
    fn metadata_file(self) -> &'static str {
        match self {
            MetadataKind::DistInfo => "METADATA",
            MetadataKind::EggInfo => "PKG-INFO",
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            MetadataKind::DistInfo => ".dist-info",
            MetadataKind::EggInfo => ".egg-info",
        }
    }
}

fn metadata_kind(path: &Path) -> Option<MetadataKind> {
    let name = path.file_name()?.to_str()?.to_ascii_lowercase();
    if name.ends_with(".dist-info") && path.is_dir() {
        Some(MetadataKind::DistInfo)
    } else if name.ends_with(".egg-info") {
        Some(MetadataKind::EggInfo)
    } else {
        None
    }
}

/// `Name:` and `Version:` headers of a core metadata file
fn read_name_version(contents: &str) -> (Option<String>, Option<String>) {
    let mut name = None;
    let mut version = None;
    for line in contents.lines() {
        // Headers end at the first blank line; the body is the long description
        if line.trim().is_empty() {
            break;
        }
        if name.is_none() {
            if let Some(value) = line.strip_prefix("Name:") {
                let trimmed = value.trim();
                if !trimmed.is_empty() {
                    name = Some(trimmed.to_string());
                }
            }
        }
        if version.is_none() {
            if let Some(value) = line.strip_prefix("Version:") {
                let trimmed = value.trim();
                if !trimmed.is_empty() {
                    version = Some(trimmed.to_string());
                }
            }
        }
        if name.is_some() && version.is_some() {
            break;
        }
    }
    (name, version)
}

/// `requests-2.31.0.dist-info` -> (`requests`, `2.31.0`)
fn split_dir_name(path: &Path, kind: MetadataKind) -> (Option<String>, Option<String>) {
    let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
        return (None, None);
    };
    let stem = &file_name[..file_name.len().saturating_sub(kind.suffix().len())];
    match stem.split_once('-') {
        Some((name, rest)) => {
            let version = rest.split('-').next().unwrap_or(rest);
            (Some(name.to_string()), Some(version.to_string()))
        }
        None if !stem.is_empty() => (Some(stem.to_string()), None),
        None => (None, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::categorizer::FullStdlib;
    use tempfile::TempDir;

    fn write_dist(site: &Path, dir_name: &str, metadata: &str, top_level: Option<&str>) {
        let dist = site.join(dir_name);
        fs::create_dir_all(&dist).unwrap();
        fs::write(dist.join("METADATA"), metadata).unwrap();
        if let Some(top) = top_level {
            fs::write(dist.join("top_level.txt"), top).unwrap();
        }
    }

    fn fake_resolver() -> HashMap<String, Distribution> {
        let mut resolver = HashMap::new();
        resolver.insert("requests".to_string(), Distribution::new("requests", "2.31.0"));
        resolver.insert("yaml".to_string(), Distribution::new("PyYAML", "6.0.1"));
        resolver
    }

    #[test]
    fn test_resolve_with_fake_resolver() {
        let candidates: BTreeSet<String> = ["requests", "yaml", "mystery", "os"]
            .into_iter()
            .map(String::from)
            .collect();

        let resolution = resolve(&candidates, &FullStdlib::default(), &fake_resolver());
        let pinned: Vec<&str> = resolution.pinned.iter().map(String::as_str).collect();
        assert_eq!(pinned, vec!["PyYAML==6.0.1", "requests==2.31.0"]);
        assert_eq!(resolution.unresolved, vec!["mystery".to_string()]);
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("Typing_Extensions"), "typing-extensions");
        assert_eq!(normalize_name("zope.interface"), "zope-interface");
    }

    #[test]
    fn test_site_packages_index() {
        let site = TempDir::new().unwrap();
        write_dist(
            site.path(),
            "requests-2.31.0.dist-info",
            "Metadata-Version: 2.1\nName: requests\nVersion: 2.31.0\n\nName: ignored\n",
            Some("requests\n"),
        );
        write_dist(
            site.path(),
            "PyYAML-6.0.1.dist-info",
            "Metadata-Version: 2.1\nName: PyYAML\nVersion: 6.0.1\n",
            Some("_yaml\nyaml\n"),
        );
        write_dist(
            site.path(),
            "typing_extensions-4.9.0.dist-info",
            "Metadata-Version: 2.1\nName: typing_extensions\nVersion: 4.9.0\n",
            None,
        );
        fs::create_dir_all(site.path().join("requests")).unwrap();

        let index = SitePackagesIndex::scan(&[site.path().to_path_buf()]);
        assert_eq!(index.len(), 3);

        assert_eq!(index.lookup("requests").unwrap().pin(), "requests==2.31.0");
        assert_eq!(index.lookup("yaml").unwrap().pin(), "PyYAML==6.0.1");
        assert_eq!(
            index.lookup("typing_extensions").unwrap().pin(),
            "typing_extensions==4.9.0"
        );
        assert!(index.lookup("numpy").is_none());
    }

    #[test]
    fn test_egg_info_and_dir_name_fallback() {
        let site = TempDir::new().unwrap();
        let egg = site.path().join("legacy_pkg-1.2.egg-info");
        fs::create_dir_all(&egg).unwrap();
        fs::write(egg.join("PKG-INFO"), "Metadata-Version: 1.0\nName: legacy-pkg\n").unwrap();
        fs::write(egg.join("top_level.txt"), "legacy\n").unwrap();

        let index = SitePackagesIndex::scan(&[site.path().to_path_buf()]);
        assert_eq!(index.lookup("legacy").unwrap().pin(), "legacy-pkg==1.2");
        assert_eq!(index.lookup("legacy_pkg").unwrap().pin(), "legacy-pkg==1.2");
    }

    #[test]
    fn test_missing_site_packages_is_empty() {
        let index = SitePackagesIndex::scan(&[PathBuf::from("/definitely/not/here")]);
        assert!(index.is_empty());
    }

    #[test]
    fn test_read_name_version_stops_at_body() {
        let (name, version) = read_name_version("Name: a\n\nVersion: 1\n");
        assert_eq!(name.as_deref(), Some("a"));
        assert!(version.is_none());
    }
}
