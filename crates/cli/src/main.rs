use anyhow::Context;
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use mta_rust_reqgen_core::{
    format_report, generate, read_manifest, write_report_manifest, ExtractStrategy,
    FailurePolicy, FileConfig, ManifestDiff, OutputFormat, ScanConfig, StdlibPolicy,
};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "reqgen")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Generate a requirements manifest from the imports of a Python project")]
#[command(long_about = "Scans a project directory for Python sources (.py) and Jupyter notebooks \
    (.ipynb), extracts every imported top-level module, drops modules that belong to the project \
    or to the standard library, and writes the rest to a sorted requirements file.\n\n\
    Without a PATH argument the project root is asked for interactively.")]
pub struct Args {
    /// Project root directory to scan (prompted for when omitted)
    pub path: Option<PathBuf>,

    /// Manifest file to write [default: my_requirements.txt]
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Report format printed to stdout
    #[arg(short, long, value_enum, default_value_t = OutputFormatArg::Summary)]
    pub format: OutputFormatArg,

    /// Import extraction strategy
    #[arg(long, value_enum)]
    pub strategy: Option<StrategyArg>,

    /// What to do with files that fail to parse
    #[arg(long, value_enum)]
    pub on_error: Option<FailurePolicyArg>,

    /// Which modules count as standard library
    #[arg(long, value_enum)]
    pub stdlib: Option<StdlibArg>,

    /// Pin imports to installed distributions (name==version)
    #[arg(long)]
    pub resolve: bool,

    /// Python interpreter to probe for builtins and site-packages
    #[arg(long)]
    pub python: Option<String>,

    /// Site-packages directory to resolve against (repeatable)
    #[arg(long, action = clap::ArgAction::Append)]
    pub site_packages: Vec<PathBuf>,

    /// Additional ignore patterns (glob style)
    #[arg(long, action = clap::ArgAction::Append)]
    pub ignore: Vec<String>,

    /// Ignore file path (gitignore syntax)
    #[arg(long)]
    pub ignore_file: Option<PathBuf>,

    /// Honor the project's .gitignore
    #[arg(long)]
    pub gitignore: bool,

    /// Skip virtualenvs, caches and build output
    #[arg(long)]
    pub skip_envs: bool,

    /// Parse notebook cells as-is instead of blanking IPython magics
    #[arg(long)]
    pub keep_magics: bool,

    /// Config file [default: <PATH>/reqgen.toml if present]
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Print the report without writing the manifest
    #[arg(long)]
    pub dry_run: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Log everything
    #[arg(long)]
    pub trace: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormatArg {
    Summary,
    Json,
    Yaml,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Summary => OutputFormat::Summary,
            OutputFormatArg::Json => OutputFormat::Json,
            OutputFormatArg::Yaml => OutputFormat::Yaml,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum StrategyArg {
    /// Syntax-tree walk; invalid files are errors
    Syntax,
    /// Line-based regex; tolerant but can be fooled by strings
    Lexical,
}

impl From<StrategyArg> for ExtractStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Syntax => ExtractStrategy::Syntax,
            StrategyArg::Lexical => ExtractStrategy::Lexical,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailurePolicyArg {
    Abort,
    Skip,
}

impl From<FailurePolicyArg> for FailurePolicy {
    fn from(arg: FailurePolicyArg) -> Self {
        match arg {
            FailurePolicyArg::Abort => FailurePolicy::Abort,
            FailurePolicyArg::Skip => FailurePolicy::Skip,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum StdlibArg {
    /// Every module shipped with Python
    Full,
    /// Only modules compiled into the interpreter
    Builtin,
}

impl From<StdlibArg> for StdlibPolicy {
    fn from(arg: StdlibArg) -> Self {
        match arg {
            StdlibArg::Full => StdlibPolicy::Full,
            StdlibArg::Builtin => StdlibPolicy::Builtin,
        }
    }
}

fn init_tracing(trace: bool, verbose: u8) -> anyhow::Result<()> {
    let level = if trace {
        "trace"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("mta_rust_reqgen_core={level},reqgen={level}")));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .with_level(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to install the log subscriber")
}

/// Ask for the project root on stdin
fn prompt_for_root() -> anyhow::Result<PathBuf> {
    print!("Enter path to your project root directory: ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let answer = line.trim();
    if answer.is_empty() {
        anyhow::bail!("no project root given");
    }
    Ok(PathBuf::from(answer))
}

fn absolutize(path: &Path) -> anyhow::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

/// Defaults, then the config file, then command-line flags
fn build_config(args: &Args, root: PathBuf) -> anyhow::Result<ScanConfig> {
    let file = match args.config {
        Some(ref path) => Some(
            FileConfig::load(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
        ),
        None => FileConfig::discover(&root)?,
    };

    let mut config = ScanConfig::new(root);
    if let Some(file) = file {
        config = config.merge_file(file);
    }

    if let Some(output) = args.output.clone() {
        config = config.with_output(output);
    }
    if let Some(strategy) = args.strategy {
        config = config.with_strategy(strategy.into());
    }
    if let Some(policy) = args.on_error {
        config = config.with_failure_policy(policy.into());
    }
    if let Some(policy) = args.stdlib {
        config = config.with_stdlib_policy(policy.into());
    }
    if args.resolve {
        config = config.with_resolve(true);
    }
    if let Some(python) = args.python.clone() {
        config = config.with_python(python);
    }
    if !args.site_packages.is_empty() {
        config = config.with_site_packages(args.site_packages.clone());
    }
    if !args.ignore.is_empty() {
        let mut patterns = config.ignore_patterns.clone();
        patterns.extend(args.ignore.iter().cloned());
        config = config.with_ignore_patterns(patterns);
    }
    if let Some(ignore_file) = args.ignore_file.clone() {
        config = config.with_ignore_file(ignore_file);
    }
    if args.gitignore {
        config = config.with_respect_gitignore(true);
    }
    if args.skip_envs {
        config = config.with_skip_environments(true);
    }
    if args.keep_magics {
        config = config.with_strip_magics(false);
    }

    Ok(config)
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.trace, args.verbose)?;

    let root = match args.path {
        Some(ref path) => path.clone(),
        None => prompt_for_root()?,
    };
    let root = absolutize(&root)?;
    if !root.is_dir() {
        anyhow::bail!("{} is not a directory", root.display());
    }

    let config = build_config(&args, root)?;

    // Show progress if verbose
    let spinner = if args.verbose > 0 {
        let pb = ProgressBar::new_spinner();
        pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_message("Scanning project...");
        Some(pb)
    } else {
        None
    };

    let report = generate(&config)?;

    if let Some(ref pb) = spinner {
        pb.finish_with_message(format!(
            "Scanned {} files in {}ms",
            report.stats.total_files, report.metadata.scan_duration_ms
        ));
    }

    println!("{}", format_report(&report, args.format.into())?);

    if args.dry_run {
        return Ok(());
    }

    if config.output.is_file() {
        match read_manifest(&config.output) {
            Ok(previous) => {
                let diff = ManifestDiff::between(&previous, report.manifest_entries());
                if diff.is_empty() {
                    tracing::info!("manifest unchanged");
                } else {
                    tracing::info!(added = ?diff.added, removed = ?diff.removed, "manifest changed");
                }
            }
            Err(err) => tracing::debug!(error = %err, "previous manifest not readable"),
        }
    }

    write_report_manifest(&report, &config)?;
    if args.verbose > 0 {
        eprintln!("Manifest written to: {}", config.output.display());
    }

    Ok(())
}
