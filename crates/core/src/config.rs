use crate::categorizer::StdlibPolicy;
use crate::parsers::ExtractStrategy;
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Manifest file written when no output path is given
pub const DEFAULT_OUTPUT: &str = "my_requirements.txt";

/// Config file picked up from the scan root when present
pub const CONFIG_FILE_NAME: &str = "reqgen.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to build glob pattern: {0}")]
    GlobError(#[from] globset::Error),
    #[error("Failed to parse gitignore: {0}")]
    GitignoreError(#[from] ignore::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Invalid config file {path}: {source}")]
    TomlError {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// What to do when a file or notebook cell fails to parse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Stop the whole run on the first failure
    #[default]
    Abort,
    /// Log the failure and carry on without the offending file or cell
    Skip,
}

/// Configuration for scanning
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Root directory to scan
    pub root: PathBuf,
    /// Import extraction strategy
    pub strategy: ExtractStrategy,
    pub failure_policy: FailurePolicy,
    /// Which modules count as standard library
    pub stdlib_policy: StdlibPolicy,
    /// Additional ignore patterns (glob style)
    pub ignore_patterns: Vec<String>,
    /// Custom ignore file path
    pub ignore_file: Option<PathBuf>,
    /// Honor the root's .gitignore
    pub respect_gitignore: bool,
    /// Skip virtualenvs, caches and build output
    pub skip_environments: bool,
    /// Blank IPython magics in notebook cells before parsing
    pub strip_magics: bool,
    /// Pin candidates to installed distributions
    pub resolve: bool,
    /// Site-packages directories to resolve against; probed from `python` when empty
    pub site_packages: Vec<PathBuf>,
    /// Interpreter used to probe the host environment
    pub python: String,
    /// Manifest output path
    pub output: PathBuf,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            strategy: ExtractStrategy::default(),
            failure_policy: FailurePolicy::default(),
            stdlib_policy: StdlibPolicy::default(),
            ignore_patterns: vec![],
            ignore_file: None,
            respect_gitignore: false,
            skip_environments: false,
            strip_magics: true,
            resolve: false,
            site_packages: vec![],
            python: "python3".to_string(),
            output: PathBuf::from(DEFAULT_OUTPUT),
        }
    }
}

impl ScanConfig {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            ..Default::default()
        }
    }

    pub fn with_strategy(mut self, strategy: ExtractStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn with_stdlib_policy(mut self, policy: StdlibPolicy) -> Self {
        self.stdlib_policy = policy;
        self
    }

    pub fn with_ignore_patterns(mut self, patterns: Vec<String>) -> Self {
        self.ignore_patterns = patterns;
        self
    }

    pub fn with_ignore_file(mut self, path: PathBuf) -> Self {
        self.ignore_file = Some(path);
        self
    }

    pub fn with_respect_gitignore(mut self, respect: bool) -> Self {
        self.respect_gitignore = respect;
        self
    }

    pub fn with_skip_environments(mut self, skip: bool) -> Self {
        self.skip_environments = skip;
        self
    }

    pub fn with_strip_magics(mut self, strip: bool) -> Self {
        self.strip_magics = strip;
        self
    }

    pub fn with_resolve(mut self, resolve: bool) -> Self {
        self.resolve = resolve;
        self
    }

    pub fn with_site_packages(mut self, dirs: Vec<PathBuf>) -> Self {
        self.site_packages = dirs;
        self
    }

    pub fn with_python(mut self, python: impl Into<String>) -> Self {
        self.python = python.into();
        self
    }

    pub fn with_output(mut self, output: PathBuf) -> Self {
        self.output = output;
        self
    }

    /// Overlay values set in a config file
    pub fn merge_file(mut self, file: FileConfig) -> Self {
        if let Some(strategy) = file.strategy {
            self.strategy = strategy;
        }
        if let Some(policy) = file.on_error {
            self.failure_policy = policy;
        }
        if let Some(policy) = file.stdlib {
            self.stdlib_policy = policy;
        }
        if let Some(patterns) = file.ignore {
            self.ignore_patterns.extend(patterns);
        }
        if let Some(path) = file.ignore_file {
            self.ignore_file = Some(path);
        }
        if let Some(respect) = file.gitignore {
            self.respect_gitignore = respect;
        }
        if let Some(skip) = file.skip_envs {
            self.skip_environments = skip;
        }
        if let Some(strip) = file.strip_magics {
            self.strip_magics = strip;
        }
        if let Some(resolve) = file.resolve {
            self.resolve = resolve;
        }
        if let Some(dirs) = file.site_packages {
            self.site_packages = dirs;
        }
        if let Some(python) = file.python {
            self.python = python;
        }
        if let Some(output) = file.output {
            self.output = output;
        }
        self
    }
}

/// Settings read from `reqgen.toml`; every key is optional
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileConfig {
    pub strategy: Option<ExtractStrategy>,
    pub on_error: Option<FailurePolicy>,
    pub stdlib: Option<StdlibPolicy>,
    pub ignore: Option<Vec<String>>,
    pub ignore_file: Option<PathBuf>,
    pub gitignore: Option<bool>,
    pub skip_envs: Option<bool>,
    pub strip_magics: Option<bool>,
    pub resolve: Option<bool>,
    pub site_packages: Option<Vec<PathBuf>>,
    pub python: Option<String>,
    pub output: Option<PathBuf>,
}

impl FileConfig {
    pub fn from_toml_str(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::TomlError {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content, path)
    }

    /// Load `reqgen.toml` from `root` if it exists
    pub fn discover(root: &Path) -> Result<Option<Self>, ConfigError> {
        let path = root.join(CONFIG_FILE_NAME);
        if path.is_file() {
            Self::load(&path).map(Some)
        } else {
            Ok(None)
        }
    }
}

/// Filter for ignoring files and directories
pub struct IgnoreFilter {
    root: PathBuf,
    gitignore: Option<Gitignore>,
    custom_globs: GlobSet,
    default_ignores: GlobSet,
}

impl IgnoreFilter {
    pub fn new(config: &ScanConfig) -> Result<Self, ConfigError> {
        let gitignore = if let Some(ref ignore_file) = config.ignore_file {
            let mut builder = GitignoreBuilder::new(&config.root);
            if let Some(err) = builder.add(ignore_file) {
                return Err(err.into());
            }
            Some(builder.build()?)
        } else if config.respect_gitignore {
            let gitignore_path = config.root.join(".gitignore");
            if gitignore_path.exists() {
                let mut builder = GitignoreBuilder::new(&config.root);
                if let Some(err) = builder.add(&gitignore_path) {
                    return Err(err.into());
                }
                Some(builder.build()?)
            } else {
                None
            }
        } else {
            None
        };

        let mut custom_builder = GlobSetBuilder::new();
        for pattern in &config.ignore_patterns {
            custom_builder.add(Glob::new(pattern)?);
        }
        let custom_globs = custom_builder.build()?;

        let mut default_builder = GlobSetBuilder::new();
        if config.skip_environments {
            default_builder.add(Glob::new("**/.venv/**")?);
            default_builder.add(Glob::new("**/venv/**")?);
            default_builder.add(Glob::new("**/site-packages/**")?);
            default_builder.add(Glob::new("**/__pycache__/**")?);
            default_builder.add(Glob::new("**/.ipynb_checkpoints/**")?);
            default_builder.add(Glob::new("**/node_modules/**")?);
            default_builder.add(Glob::new("**/dist/**")?);
            default_builder.add(Glob::new("**/build/**")?);
            default_builder.add(Glob::new("**/.git/**")?);
            default_builder.add(Glob::new("**/.tox/**")?);
        }
        let default_ignores = default_builder.build()?;

        Ok(Self {
            root: config.root.clone(),
            gitignore,
            custom_globs,
            default_ignores,
        })
    }

    /// Check if a path should be ignored; globs match the path relative to the root
    pub fn should_ignore(&self, path: &Path, is_dir: bool) -> bool {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        let path_str = relative.to_string_lossy();

        if self.default_ignores.is_match(&*path_str) {
            return true;
        }

        if self.custom_globs.is_match(&*path_str) {
            return true;
        }

        if let Some(ref gi) = self.gitignore {
            // matched_path_or_any_parents panics outside the gitignore root
            if path.starts_with(gi.path())
                && gi.matched_path_or_any_parents(path, is_dir).is_ignore()
            {
                return true;
            }
        }

        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = ScanConfig::default();
        assert_eq!(config.root, PathBuf::from("."));
        assert_eq!(config.strategy, ExtractStrategy::Syntax);
        assert_eq!(config.failure_policy, FailurePolicy::Abort);
        assert_eq!(config.stdlib_policy, StdlibPolicy::Full);
        assert_eq!(config.output, PathBuf::from("my_requirements.txt"));
        assert!(!config.resolve);
        assert!(!config.skip_environments);
        assert!(config.strip_magics);
    }

    #[test]
    fn test_config_builder() {
        let config = ScanConfig::new(PathBuf::from("/test"))
            .with_strategy(ExtractStrategy::Lexical)
            .with_failure_policy(FailurePolicy::Skip)
            .with_ignore_patterns(vec!["**/tests/**".to_string()])
            .with_skip_environments(true)
            .with_resolve(true)
            .with_python("python3.12");

        assert_eq!(config.root, PathBuf::from("/test"));
        assert_eq!(config.strategy, ExtractStrategy::Lexical);
        assert_eq!(config.failure_policy, FailurePolicy::Skip);
        assert!(config.skip_environments);
        assert!(config.resolve);
        assert_eq!(config.python, "python3.12");
    }

    #[test]
    fn test_file_config_merge() {
        let file = FileConfig::from_toml_str(
            r#"
strategy = "lexical"
on-error = "skip"
stdlib = "builtin"
ignore = ["**/migrations/**"]
resolve = true
output = "requirements.txt"
"#,
            Path::new("reqgen.toml"),
        )
        .unwrap();

        let config = ScanConfig::new(PathBuf::from("/p"))
            .with_ignore_patterns(vec!["**/tests/**".to_string()])
            .merge_file(file);

        assert_eq!(config.strategy, ExtractStrategy::Lexical);
        assert_eq!(config.failure_policy, FailurePolicy::Skip);
        assert_eq!(config.stdlib_policy, StdlibPolicy::Builtin);
        assert_eq!(config.ignore_patterns.len(), 2);
        assert!(config.resolve);
        assert_eq!(config.output, PathBuf::from("requirements.txt"));
        assert!(config.strip_magics);
    }

    #[test]
    fn test_file_config_rejects_unknown_keys() {
        let err = FileConfig::from_toml_str("colour = \"red\"", Path::new("reqgen.toml"));
        assert!(matches!(err, Err(ConfigError::TomlError { .. })));
    }

    #[test]
    fn test_discover_config_file() {
        let dir = TempDir::new().unwrap();
        assert!(FileConfig::discover(dir.path()).unwrap().is_none());

        fs::write(dir.path().join(CONFIG_FILE_NAME), "python = \"/usr/bin/python3\"\n").unwrap();
        let file = FileConfig::discover(dir.path()).unwrap().unwrap();
        assert_eq!(file.python.as_deref(), Some("/usr/bin/python3"));
    }

    #[test]
    fn test_environment_dirs_only_skipped_on_request() {
        let root = PathBuf::from("/project");
        let venv_file = root.join(".venv/lib/site.py");

        let filter = IgnoreFilter::new(&ScanConfig::new(root.clone())).unwrap();
        assert!(!filter.should_ignore(&venv_file, false));

        let filter =
            IgnoreFilter::new(&ScanConfig::new(root.clone()).with_skip_environments(true)).unwrap();
        assert!(filter.should_ignore(&venv_file, false));
        assert!(!filter.should_ignore(&root.join("app/main.py"), false));
    }

    #[test]
    fn test_gitignore_respected() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".gitignore"), "scratch/\n").unwrap();
        let scratch = dir.path().join("scratch/tmp.py");

        let config = ScanConfig::new(dir.path().to_path_buf()).with_respect_gitignore(true);
        let filter = IgnoreFilter::new(&config).unwrap();
        assert!(filter.should_ignore(&scratch, false));
        assert!(!filter.should_ignore(&dir.path().join("main.py"), false));
    }
}
